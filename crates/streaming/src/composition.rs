//! City switching.
//!
//! [`CityScene`] owns the scene model for the active city. Selecting a city
//! clears the published snapshot immediately and hands out a [`LoadTicket`];
//! the load result is committed only if that ticket is still current, so a
//! slow response for a previously selected city can never overwrite the one
//! the user picked last.

use std::sync::Arc;

use formats::{CityConfig, CityTable, ParseOptions};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use runtime::{EventBus, EventKind, Frame};
use scene::{CameraView, MotionModel, SceneSnapshot, TrainPose, focus_view};
use tracing::{debug, info, warn};

use crate::request::LoadTicket;
use crate::source::SourceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    /// The load succeeded but produced no lines.
    NoData,
    Error(String),
}

impl LoadStatus {
    /// Text for the status indicator.
    pub fn indicator(&self) -> &'static str {
        match self {
            LoadStatus::Idle => "STANDBY",
            LoadStatus::Loading => "LOADING",
            LoadStatus::Ready => "ONLINE",
            LoadStatus::NoData => "NO DATA FOUND",
            LoadStatus::Error(_) => "ERROR",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading)
    }
}

/// Outcome of handing a load result to [`CityScene::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    Applied { lines: usize, stations: usize },
    /// The ticket belongs to an older selection; nothing changed.
    Stale,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompositionError {
    UnknownCity(String),
}

impl std::fmt::Display for CompositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositionError::UnknownCity(id) => write!(f, "unknown city: {id}"),
        }
    }
}

impl std::error::Error for CompositionError {}

#[derive(Debug)]
pub struct CityScene {
    cities: CityTable,
    options: ParseOptions,
    generation: u64,
    active: Option<String>,
    status: LoadStatus,
    snapshot: Arc<SceneSnapshot>,
    motion: MotionModel,
    camera: CameraView,
    rng: ChaCha8Rng,
    events: EventBus,
}

impl CityScene {
    /// `seed` drives train spawn state so runs are reproducible.
    pub fn new(cities: CityTable, seed: u64) -> Self {
        Self {
            cities,
            options: ParseOptions::default(),
            generation: 0,
            active: None,
            status: LoadStatus::Idle,
            snapshot: Arc::new(SceneSnapshot::empty()),
            motion: MotionModel::new(),
            camera: CameraView::overview(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: EventBus::new(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cities(&self) -> &CityTable {
        &self.cities
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn active_city(&self) -> Option<&CityConfig> {
        let id = self.active.as_deref()?;
        self.cities.get(id).ok()
    }

    /// Current published scene. Readers keep their `Arc` for as long as they
    /// draw from it; a commit swaps in a new one.
    pub fn snapshot(&self) -> Arc<SceneSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn motion(&self) -> &MotionModel {
        &self.motion
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn camera(&self) -> CameraView {
        self.camera
    }

    /// Points the camera at a station of the current scene.
    pub fn fly_to(&mut self, station_id: &str) -> Option<CameraView> {
        let station = self.snapshot.stations.iter().find(|s| s.id == station_id)?;
        self.camera = focus_view(station);
        Some(self.camera)
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && self.active.as_deref() == Some(&ticket.city_id)
    }

    /// Starts loading `city_id`. The previous city's geometry is dropped now,
    /// not when the new data arrives.
    pub fn select_city(&mut self, city_id: &str) -> Result<LoadTicket, CompositionError> {
        if self.cities.get(city_id).is_err() {
            return Err(CompositionError::UnknownCity(city_id.to_string()));
        }
        self.generation += 1;
        self.active = Some(city_id.to_string());
        self.status = LoadStatus::Loading;
        self.snapshot = Arc::new(SceneSnapshot::empty());
        self.motion = MotionModel::new();
        info!(city = city_id, generation = self.generation, "city selected");
        self.events.emit(self.generation, EventKind::CitySelected, city_id);
        Ok(LoadTicket::new(city_id, self.generation))
    }

    /// Applies a finished load if `ticket` is still the current selection.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<SceneSnapshot, SourceError>,
    ) -> Commit {
        if !self.is_current(ticket) {
            debug!(
                city = %ticket.city_id,
                generation = ticket.generation,
                current = self.generation,
                "discarding stale load"
            );
            self.events.emit(ticket.generation, EventKind::StaleDiscarded, &*ticket.city_id);
            return Commit::Stale;
        }

        match result {
            Ok(mut snapshot) => {
                snapshot.city_id = ticket.city_id.clone();
                let lines = snapshot.lines.len();
                let stations = snapshot.stations.len();
                self.motion = MotionModel::from_lines(&snapshot.lines, &mut self.rng);
                self.snapshot = Arc::new(snapshot);
                self.camera = CameraView::overview();
                self.status = if lines == 0 {
                    LoadStatus::NoData
                } else {
                    LoadStatus::Ready
                };
                info!(
                    city = %ticket.city_id,
                    lines,
                    stations,
                    trains = self.motion.len(),
                    "scene committed"
                );
                self.events.emit(
                    ticket.generation,
                    EventKind::SceneCommitted,
                    format!("{} lines, {} stations", lines, stations),
                );
                Commit::Applied { lines, stations }
            }
            Err(err) => {
                warn!(city = %ticket.city_id, error = %err, "city load failed");
                self.status = LoadStatus::Error(err.to_string());
                self.events.emit(ticket.generation, EventKind::LoadFailed, err.to_string());
                Commit::Failed
            }
        }
    }

    /// Per-frame train update.
    pub fn update(&mut self, delta_s: f64) {
        self.motion.update(delta_s);
    }

    pub fn update_frame(&mut self, frame: &Frame) {
        self.motion.update_frame(frame);
    }

    pub fn poses(&self) -> Vec<TrainPose> {
        self.motion.poses()
    }
}
