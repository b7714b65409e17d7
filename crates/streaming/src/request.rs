/// Identifies one city load so its result can be matched to the selection
/// that started it.
///
/// A ticket is only honoured while its `generation` is still the latest one
/// handed out by the composition; anything older is a stale response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub city_id: String,
    pub generation: u64,
}

impl LoadTicket {
    pub fn new(city_id: impl Into<String>, generation: u64) -> Self {
        Self {
            city_id: city_id.into(),
            generation,
        }
    }
}
