//! Spherical pseudo-Mercator projection (the EPSG:3857 family).
//!
//! The forward formula is evaluated in a fixed operation order so results are
//! bit-reproducible across platforms that use IEEE-754 doubles.

use core::f64::consts::PI;

/// Half the equatorial circumference used by the projection, in meters.
pub const MERCATOR_HALF_EXTENT: f64 = 20_037_508.34;
/// Projection units per degree of longitude.
pub const MERCATOR_K: f64 = MERCATOR_HALF_EXTENT / 180.0;

/// Geodetic coordinates in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeodeticPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeodeticPoint {
    pub const fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// Planar pseudo-Mercator coordinates (meters-equivalent).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ProjectionError {
    NonFinite { lon_deg: f64, lat_deg: f64 },
    LatitudeOutOfRange { lat_deg: f64 },
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::NonFinite { lon_deg, lat_deg } => {
                write!(f, "non-finite coordinate: lon={lon_deg} lat={lat_deg}")
            }
            ProjectionError::LatitudeOutOfRange { lat_deg } => {
                write!(f, "latitude {lat_deg} outside the open interval (-90, 90)")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Raw forward projection.
///
/// No domain checks: at `lat = ±90` the result is infinite or NaN. Use
/// [`try_project`] anywhere the output can reach scene geometry.
pub fn project(lon_deg: f64, lat_deg: f64) -> ProjectedPoint {
    let x = lon_deg * MERCATOR_K;
    let y = ((90.0 + lat_deg) * PI / 360.0).tan().ln() / (PI / 180.0);
    ProjectedPoint::new(x, y * MERCATOR_K)
}

/// Checked forward projection: rejects non-finite input and the poles.
pub fn try_project(point: GeodeticPoint) -> Result<ProjectedPoint, ProjectionError> {
    let GeodeticPoint { lon_deg, lat_deg } = point;
    if !lon_deg.is_finite() || !lat_deg.is_finite() {
        return Err(ProjectionError::NonFinite { lon_deg, lat_deg });
    }
    if lat_deg <= -90.0 || lat_deg >= 90.0 {
        return Err(ProjectionError::LatitudeOutOfRange { lat_deg });
    }
    let projected = project(lon_deg, lat_deg);
    if !projected.x.is_finite() || !projected.y.is_finite() {
        // Latitudes a hair inside the poles can still overflow the tangent.
        return Err(ProjectionError::LatitudeOutOfRange { lat_deg });
    }
    Ok(projected)
}

/// Inverse of [`project`].
pub fn unproject(point: ProjectedPoint) -> GeodeticPoint {
    let lon_deg = point.x / MERCATOR_K;
    let lat_deg = (point.y / MERCATOR_K * PI / 180.0).exp().atan() * 360.0 / PI - 90.0;
    GeodeticPoint::new(lon_deg, lat_deg)
}
