use foundation::math::Vec3;

use crate::model::MetroStation;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Shorter queries match nothing.
pub const MIN_QUERY_CHARS: usize = 2;

/// Camera placement for flying to a station.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView {
    pub eye: Vec3,
    pub target: Vec3,
}

impl CameraView {
    /// Overview of the whole city from above and to the south.
    pub fn overview() -> Self {
        Self {
            eye: Vec3::new(0.0, 20.0, 20.0),
            target: Vec3::ZERO,
        }
    }
}

/// Case-insensitive substring search over station names, in scene order.
pub fn search_stations<'a>(
    stations: &'a [MetroStation],
    query: &str,
    limit: usize,
) -> Vec<&'a MetroStation> {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    stations
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}

/// Close-up view looking down at a station.
pub fn focus_view(station: &MetroStation) -> CameraView {
    let target = station.position;
    CameraView {
        eye: target + Vec3::new(1.0, 2.0, 1.0),
        target,
    }
}
