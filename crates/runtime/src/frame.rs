use foundation::time::Time;

/// Per-frame timing handed to anything driven by the render loop.
///
/// Renderers report a variable delta each frame; `Frame` accumulates it into
/// an engine clock so motion updates can be recorded and replayed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds elapsed since the previous frame.
    pub dt_s: f64,
    /// Engine time when the frame begins (seconds).
    pub time: Time,
}

impl Frame {
    pub fn first() -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time: Time(0.0),
        }
    }

    /// Fixed-step frame, handy for headless simulation.
    pub fn fixed(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    /// Next frame after `dt_s` seconds. Negative or non-finite deltas
    /// (clock hiccups) are treated as zero.
    pub fn advance(self, dt_s: f64) -> Self {
        let dt_s = if dt_s.is_finite() && dt_s > 0.0 {
            dt_s
        } else {
            0.0
        };
        Self {
            index: self.index + 1,
            dt_s,
            time: self.time.advance(dt_s),
        }
    }
}
