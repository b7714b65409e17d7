use super::{GeodeticPoint, ProjectedPoint, ProjectionError, Vec2, Vec3, try_project, unproject};

/// Projection units per scene unit. Shared by every entity type so lines,
/// stations and buildings stay registered against each other.
pub const SCENE_SCALE: f64 = 1000.0;

/// A point in the local scene frame: `x` east, `y` elevation tier, `z` south.
pub type ScenePoint = Vec3;

/// Scene frame anchored at a geodetic origin (typically a city center).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LocalFrame {
    anchor: GeodeticPoint,
    origin: ProjectedPoint,
    scale: f64,
}

impl LocalFrame {
    pub fn new(anchor: GeodeticPoint) -> Result<Self, ProjectionError> {
        Self::with_scale(anchor, SCENE_SCALE)
    }

    pub fn with_scale(anchor: GeodeticPoint, scale: f64) -> Result<Self, ProjectionError> {
        let origin = try_project(anchor)?;
        Ok(Self {
            anchor,
            origin,
            scale,
        })
    }

    pub fn anchor(&self) -> GeodeticPoint {
        self.anchor
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Ground-plane position `(x, z)` of a geodetic point.
    pub fn planar(&self, point: GeodeticPoint) -> Result<Vec2, ProjectionError> {
        let p = try_project(point)?;
        Ok(Vec2::new(
            (p.x - self.origin.x) / self.scale,
            -(p.y - self.origin.y) / self.scale,
        ))
    }

    /// Scene position of a geodetic point at the given elevation tier.
    pub fn localize(
        &self,
        point: GeodeticPoint,
        elevation: f64,
    ) -> Result<ScenePoint, ProjectionError> {
        let ground = self.planar(point)?;
        Ok(Vec3::new(ground.x, elevation, ground.y))
    }

    /// Geodetic point under a scene position (elevation is ignored).
    pub fn to_geodetic(&self, scene: ScenePoint) -> GeodeticPoint {
        unproject(ProjectedPoint::new(
            scene.x * self.scale + self.origin.x,
            -scene.z * self.scale + self.origin.y,
        ))
    }
}
