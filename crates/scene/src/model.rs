use foundation::math::{ScenePoint, Vec2};

/// Colour used for lines that carry no usable colour of their own.
pub const DEFAULT_LINE_COLOR: &str = "#FFFFFF";
/// Trains on white lines are drawn in this colour so they stand out.
pub const HIGHLIGHT_TRAIN_COLOR: &str = "#00FFFF";

/// One transit line, already in scene coordinates.
///
/// Every point carries the same `y`: the line's elevation tier, derived from
/// its colour when the line was parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct MetroLine {
    pub id: String,
    pub name: String,
    pub color: String,
    pub elevation: f64,
    pub points: Vec<ScenePoint>,
}

impl MetroLine {
    /// A smooth curve (and therefore a train) needs at least two points.
    pub fn supports_curve(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn train_color(&self) -> &str {
        if self.color.eq_ignore_ascii_case(DEFAULT_LINE_COLOR) {
            HIGHLIGHT_TRAIN_COLOR
        } else {
            &self.color
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetroStation {
    pub id: String,
    pub name: String,
    pub position: ScenePoint,
}

/// Outer ring of a building in the ground plane: `x` east, `y` = scene `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingFootprint {
    pub id: String,
    pub ring: Vec<Vec2>,
}

/// Everything the renderer draws for one city, published as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSnapshot {
    pub city_id: String,
    pub lines: Vec<MetroLine>,
    pub stations: Vec<MetroStation>,
    pub buildings: Vec<BuildingFootprint>,
}

impl SceneSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.stations.is_empty() && self.buildings.is_empty()
    }

    pub fn line(&self, id: &str) -> Option<&MetroLine> {
        self.lines.iter().find(|l| l.id == id)
    }
}
