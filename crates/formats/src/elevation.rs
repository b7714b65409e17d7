//! Line colour → elevation tier.
//!
//! Real 3D infrastructure data is not available for most feeds, so a line's
//! display colour stands in for whether it runs underground, at grade or on a
//! viaduct. The mapping is a fixed table; unknown colours sit at ground level.

/// Known line colours (uppercase `#RRGGBB`) and their elevation tier.
pub const ELEVATION_TABLE: [(&str, f64); 7] = [
    // Underground: Yellow, Orange.
    ("#FFC520", -8.0),
    ("#F58220", -8.0),
    // Elevated: Pink, Blue, Violet.
    ("#FF69B4", 10.0),
    ("#0000FF", 10.0),
    ("#800080", 10.0),
    // Mixed at-grade: Red, Green.
    ("#FF0000", 4.0),
    ("#008000", 4.0),
];

/// Tier for unrecognised colours.
pub const GROUND_ELEVATION: f64 = 0.0;

/// Neutral height every station is placed at, regardless of the lines that
/// serve it.
pub const STATION_ELEVATION: f64 = 2.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Infrastructure {
    Underground,
    AtGrade,
    Elevated,
}

impl Infrastructure {
    pub fn of(elevation: f64) -> Self {
        if elevation < 0.0 {
            Infrastructure::Underground
        } else if elevation > 5.0 {
            Infrastructure::Elevated
        } else {
            Infrastructure::AtGrade
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Infrastructure::Underground => "underground",
            Infrastructure::AtGrade => "at-grade",
            Infrastructure::Elevated => "elevated",
        }
    }
}

/// Elevation tier for a display colour. Case-insensitive; unknown → 0.
pub fn classify(color: &str) -> f64 {
    let normalized = color.trim().to_ascii_uppercase();
    ELEVATION_TABLE
        .iter()
        .find(|(known, _)| *known == normalized)
        .map(|(_, elevation)| *elevation)
        .unwrap_or(GROUND_ELEVATION)
}

#[cfg(test)]
mod tests {
    use super::{ELEVATION_TABLE, Infrastructure, classify};

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("#ffc520"), classify("#FFC520"));
        assert_eq!(classify("#ffc520"), -8.0);
        assert_eq!(classify("#Ff69b4"), 10.0);
    }

    #[test]
    fn unknown_colours_are_ground_level() {
        for c in ["#123456", "", "cyan", "#FFC52", "#00FFFF"] {
            assert_eq!(classify(c), 0.0, "colour {c:?}");
        }
    }

    #[test]
    fn every_table_entry_round_trips_through_classify() {
        for (color, elevation) in ELEVATION_TABLE {
            assert_eq!(classify(color), elevation);
            assert_eq!(classify(&color.to_lowercase()), elevation);
        }
    }

    #[test]
    fn table_keys_are_normalized() {
        for (color, _) in ELEVATION_TABLE {
            assert_eq!(color, color.to_ascii_uppercase());
            assert_eq!(color.len(), 7);
        }
    }

    #[test]
    fn infrastructure_buckets() {
        assert_eq!(Infrastructure::of(-8.0), Infrastructure::Underground);
        assert_eq!(Infrastructure::of(0.0), Infrastructure::AtGrade);
        assert_eq!(Infrastructure::of(4.0), Infrastructure::AtGrade);
        assert_eq!(Infrastructure::of(10.0), Infrastructure::Elevated);
    }
}
