/// What happened to the city scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    CitySelected,
    SceneCommitted,
    StaleDiscarded,
    LoadFailed,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::CitySelected => "city.selected",
            EventKind::SceneCommitted => "scene.committed",
            EventKind::StaleDiscarded => "scene.stale_discarded",
            EventKind::LoadFailed => "scene.load_failed",
        }
    }
}

/// Structured record of a scene transition, keyed by load generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub generation: u64,
    pub kind: EventKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, generation: u64, kind: EventKind, message: impl Into<String>) {
        self.events.push(Event {
            generation,
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
