/// Time primitives
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Time(pub f64); // seconds

impl Time {
    pub fn advance(self, dt_s: f64) -> Self {
        Time(self.0 + dt_s)
    }
}

/// Wall-clock milliseconds since the Unix epoch, for cache bookkeeping.
#[cfg(not(target_arch = "wasm32"))]
pub fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
