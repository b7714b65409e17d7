//! GeoJSON feature collections → scene model.
//!
//! Parsing is total: features of the wrong geometry type are ignored,
//! coordinates that cannot be projected are dropped, and a collection without
//! features yields nothing. Results are rebuilt wholesale whenever the anchor
//! or the source data changes.

use foundation::math::{GeodeticPoint, LocalFrame, ScenePoint, Vec2};
use scene::{BuildingFootprint, DEFAULT_LINE_COLOR, MetroLine, MetroStation};

use crate::elevation::{STATION_ELEVATION, classify};
use crate::geojson::{Feature, FeatureCollection, Geometry};

/// Name-like properties, most preferred first.
pub const NAME_PROPERTIES: [&str; 5] = [
    "name:en",
    "name",
    "station",
    "official_name",
    "description",
];
pub const UNKNOWN_LINE_NAME: &str = "Unknown";
pub const UNKNOWN_STATION_NAME: &str = "Unknown Station";

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParseOptions {
    /// Height every station is placed at. Stations do not inherit the
    /// elevation of the lines serving them.
    pub station_elevation: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            station_elevation: STATION_ELEVATION,
        }
    }
}

pub fn parse_lines(collection: &FeatureCollection, frame: &LocalFrame) -> Vec<MetroLine> {
    let mut lines = Vec::new();
    for (index, feature) in collection.features.iter().enumerate() {
        let Some(Geometry::LineString(coords)) = &feature.geometry else {
            continue;
        };

        let color = feature
            .first_str_property(&["colour", "color"])
            .unwrap_or(DEFAULT_LINE_COLOR)
            .to_string();
        let elevation = classify(&color);

        let points: Vec<ScenePoint> = coords
            .iter()
            .filter_map(|p| frame.localize(*p, elevation).ok())
            .collect();
        if points.is_empty() {
            continue;
        }

        lines.push(MetroLine {
            id: feature_id(feature, "line", index),
            name: feature_name(feature, UNKNOWN_LINE_NAME),
            color,
            elevation,
            points,
        });
    }
    lines
}

pub fn parse_stations(collection: &FeatureCollection, frame: &LocalFrame) -> Vec<MetroStation> {
    parse_stations_with(collection, frame, &ParseOptions::default())
}

pub fn parse_stations_with(
    collection: &FeatureCollection,
    frame: &LocalFrame,
    options: &ParseOptions,
) -> Vec<MetroStation> {
    let mut stations = Vec::new();
    for (index, feature) in collection.features.iter().enumerate() {
        let Some(Geometry::Point(p)) = &feature.geometry else {
            continue;
        };
        let Ok(position) = frame.localize(*p, options.station_elevation) else {
            continue;
        };
        stations.push(MetroStation {
            id: feature_id(feature, "stn", index),
            name: feature_name(feature, UNKNOWN_STATION_NAME),
            position,
        });
    }
    stations
}

/// Outer rings of Polygon features, in the scene ground plane.
pub fn parse_buildings(
    collection: &FeatureCollection,
    frame: &LocalFrame,
) -> Vec<BuildingFootprint> {
    let mut buildings = Vec::new();
    for (index, feature) in collection.features.iter().enumerate() {
        let Some(Geometry::Polygon(rings)) = &feature.geometry else {
            continue;
        };
        let Some(outer) = rings.first() else {
            continue;
        };
        let ring: Vec<Vec2> = outer
            .iter()
            .filter_map(|p: &GeodeticPoint| frame.planar(*p).ok())
            .collect();
        if ring.len() < 3 {
            continue;
        }
        buildings.push(BuildingFootprint {
            id: feature_id(feature, "bldg", index),
            ring,
        });
    }
    buildings
}

fn feature_id(feature: &Feature, prefix: &str, index: usize) -> String {
    feature
        .id
        .clone()
        .unwrap_or_else(|| format!("{prefix}-{index}"))
}

fn feature_name(feature: &Feature, fallback: &str) -> String {
    feature
        .first_str_property(&NAME_PROPERTIES)
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        ParseOptions, UNKNOWN_LINE_NAME, UNKNOWN_STATION_NAME, parse_buildings, parse_lines,
        parse_stations, parse_stations_with,
    };
    use crate::geojson::FeatureCollection;
    use foundation::math::{GeodeticPoint, LocalFrame, SCENE_SCALE, project};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn delhi() -> LocalFrame {
        LocalFrame::new(GeodeticPoint::new(77.209, 28.6139)).expect("frame")
    }

    #[test]
    fn empty_and_null_collections_parse_to_nothing() {
        let frame = delhi();
        let empty = FeatureCollection::from_value(&json!({"features": []}));
        let null = FeatureCollection::from_value(&json!(null));
        assert!(parse_lines(&empty, &frame).is_empty());
        assert!(parse_lines(&null, &frame).is_empty());
        assert!(parse_stations(&null, &frame).is_empty());
        assert!(parse_buildings(&null, &frame).is_empty());
    }

    #[test]
    fn yellow_line_is_underground_and_follows_the_projection() {
        let frame = delhi();
        let fc = FeatureCollection::from_value(&json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"color": "#FFC520", "name": "Yellow Line"},
                "geometry": {"type": "LineString", "coordinates": [[77.0, 28.5], [77.5, 28.7]]}
            }]
        }));
        let lines = parse_lines(&fc, &frame);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.points.len(), 2);
        assert_eq!(line.elevation, -8.0);
        assert_eq!(line.name, "Yellow Line");
        assert_eq!(line.id, "line-0");

        let c = project(77.209, 28.6139);
        for (point, (lon, lat)) in line.points.iter().zip([(77.0, 28.5), (77.5, 28.7)]) {
            let p = project(lon, lat);
            assert_eq!(point.y, -8.0);
            assert_eq!(point.x, (p.x - c.x) / SCENE_SCALE);
            assert_eq!(point.z, -(p.y - c.y) / SCENE_SCALE);
        }
    }

    #[test]
    fn colour_property_wins_over_color_and_defaults_to_white() {
        let frame = delhi();
        let fc = FeatureCollection::from_value(&json!({"features": [
            {"properties": {"colour": "#ff69b4", "color": "#FFC520"},
             "geometry": {"type": "LineString", "coordinates": [[77.2, 28.6], [77.3, 28.6]]}},
            {"properties": {},
             "geometry": {"type": "LineString", "coordinates": [[77.2, 28.6], [77.3, 28.6]]}}
        ]}));
        let lines = parse_lines(&fc, &frame);
        assert_eq!(lines[0].color, "#ff69b4");
        assert_eq!(lines[0].elevation, 10.0);
        assert_eq!(lines[1].color, "#FFFFFF");
        assert_eq!(lines[1].elevation, 0.0);
        assert_eq!(lines[1].name, UNKNOWN_LINE_NAME);
    }

    #[test]
    fn ids_prefer_feature_id_then_position() {
        let frame = delhi();
        let fc = FeatureCollection::from_value(&json!({"features": [
            {"properties": {}, "geometry": {"type": "Point", "coordinates": [77.2, 28.6]}},
            {"id": "node/99", "properties": {}, "geometry": {"type": "Point", "coordinates": [77.2, 28.6]}},
            {"properties": {}, "geometry": {"type": "LineString", "coordinates": [[77.2, 28.6]]}},
            {"properties": {}, "geometry": {"type": "Point", "coordinates": [77.25, 28.6]}}
        ]}));
        let ids: Vec<String> = parse_stations(&fc, &frame).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["stn-0", "node/99", "stn-3"]);
    }

    #[test]
    fn station_names_follow_priority_order() {
        let frame = delhi();
        let fc = FeatureCollection::from_value(&json!({"features": [
            {"properties": {"name": "राजीव चौक", "name:en": "Rajiv Chowk"},
             "geometry": {"type": "Point", "coordinates": [77.2197, 28.6328]}},
            {"properties": {"station": "subway", "description": "Exit 2"},
             "geometry": {"type": "Point", "coordinates": [77.2197, 28.6328]}},
            {"properties": {"description": "Near the mall"},
             "geometry": {"type": "Point", "coordinates": [77.2197, 28.6328]}},
            {"properties": {},
             "geometry": {"type": "Point", "coordinates": [77.2197, 28.6328]}}
        ]}));
        let names: Vec<String> = parse_stations(&fc, &frame)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec!["Rajiv Chowk", "subway", "Near the mall", UNKNOWN_STATION_NAME]
        );
    }

    #[test]
    fn stations_sit_at_the_neutral_height_unless_configured() {
        let frame = delhi();
        let fc = FeatureCollection::from_value(&json!({"features": [
            {"properties": {}, "geometry": {"type": "Point", "coordinates": [77.209, 28.6139]}}
        ]}));
        let default = parse_stations(&fc, &frame);
        assert_eq!(default[0].position.y, 2.0);
        assert_eq!(default[0].position.x, 0.0);
        assert_eq!(default[0].position.z, 0.0);

        let custom = parse_stations_with(
            &fc,
            &frame,
            &ParseOptions {
                station_elevation: -8.0,
            },
        );
        assert_eq!(custom[0].position.y, -8.0);
    }

    #[test]
    fn unprojectable_coordinates_are_dropped() {
        let frame = delhi();
        let fc = FeatureCollection::from_value(&json!({"features": [
            {"properties": {}, "geometry": {"type": "LineString", "coordinates": [[77.0, 90.0], [77.1, 28.6]]}},
            {"properties": {}, "geometry": {"type": "LineString", "coordinates": [[77.0, -90.0]]}},
            {"properties": {}, "geometry": {"type": "Point", "coordinates": [77.0, 90.0]}}
        ]}));
        let lines = parse_lines(&fc, &frame);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].points.len(), 1);
        assert!(lines[0].points[0].is_finite());
        assert!(parse_stations(&fc, &frame).is_empty());
    }

    #[test]
    fn buildings_use_outer_ring_in_ground_plane() {
        let frame = delhi();
        let fc = FeatureCollection::from_value(&json!({"features": [
            {"properties": {}, "geometry": {"type": "Polygon", "coordinates": [
                [[77.209, 28.6139], [77.21, 28.6139], [77.21, 28.615], [77.209, 28.6139]],
                [[77.2095, 28.614], [77.2096, 28.614], [77.2096, 28.6141]]
            ]}},
            {"properties": {}, "geometry": {"type": "Polygon", "coordinates": []}},
            {"properties": {}, "geometry": {"type": "Point", "coordinates": [77.2, 28.6]}}
        ]}));
        let buildings = parse_buildings(&fc, &frame);
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].id, "bldg-0");
        assert_eq!(buildings[0].ring.len(), 4);
        assert_eq!(buildings[0].ring[0].x, 0.0);
        assert!(buildings[0].ring[2].y < 0.0, "north is -z");
    }
}
