//! Lenient GeoJSON FeatureCollection reader.
//!
//! Feeds from OSM extracts and transit APIs are messy, so reading is total:
//! a missing or non-array `features` member yields an empty collection, and a
//! feature whose geometry cannot be read keeps `geometry: None`. Only a payload
//! that is not JSON at all is an error.

use foundation::math::GeodeticPoint;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeodeticPoint),
    LineString(Vec<GeodeticPoint>),
    MultiLineString(Vec<Vec<GeodeticPoint>>),
    Polygon(Vec<Vec<GeodeticPoint>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            properties: Map::new(),
            geometry: Some(geometry),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// First non-empty string among `keys`, in order.
    pub fn first_str_property(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| {
            self.properties
                .get(*k)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug)]
pub enum GeoJsonError {
    Syntax(serde_json::Error),
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Syntax(e) => write!(f, "GeoJSON payload is not valid JSON: {e}"),
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Syntax(e) => Some(e),
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload).map_err(GeoJsonError::Syntax)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(features) = value.get("features").and_then(|v| v.as_array()) else {
            return Self::default();
        };
        Self {
            features: features.iter().filter_map(read_feature).collect(),
        }
    }

    /// Emits a GeoJSON FeatureCollection. Features without geometry are
    /// written with `"geometry": null`.
    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );

        let mut features: Vec<Value> = Vec::with_capacity(self.features.len());
        for feat in &self.features {
            let mut fobj = Map::new();
            fobj.insert("type".to_string(), Value::String("Feature".to_string()));
            if let Some(id) = &feat.id {
                fobj.insert("id".to_string(), Value::String(id.clone()));
            }
            fobj.insert(
                "properties".to_string(),
                Value::Object(feat.properties.clone()),
            );
            fobj.insert(
                "geometry".to_string(),
                feat.geometry
                    .as_ref()
                    .map(geometry_to_value)
                    .unwrap_or(Value::Null),
            );
            features.push(Value::Object(fobj));
        }

        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }
}

fn read_feature(value: &Value) -> Option<Feature> {
    let obj = value.as_object()?;

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let geometry = obj.get("geometry").and_then(read_geometry);

    Some(Feature {
        id,
        properties,
        geometry,
    })
}

/// Parses a GeoJSON geometry object. Positions that are not `[lon, lat, ..]`
/// numbers are dropped rather than failing the whole geometry.
pub fn read_geometry(value: &Value) -> Option<Geometry> {
    let obj = value.as_object()?;
    let ty = obj.get("type").and_then(|v| v.as_str())?;
    let coords = obj.get("coordinates")?;

    match ty {
        "Point" => read_position(coords).map(Geometry::Point),
        "LineString" => Some(Geometry::LineString(read_positions(coords))),
        "MultiLineString" => Some(Geometry::MultiLineString(read_rings(coords))),
        "Polygon" => Some(Geometry::Polygon(read_rings(coords))),
        _ => None,
    }
}

fn read_position(value: &Value) -> Option<GeodeticPoint> {
    let arr = value.as_array()?;
    let lon = arr.first()?.as_f64()?;
    let lat = arr.get(1)?.as_f64()?;
    Some(GeodeticPoint::new(lon, lat))
}

fn read_positions(value: &Value) -> Vec<GeodeticPoint> {
    value
        .as_array()
        .map(|arr| arr.iter().filter_map(read_position).collect())
        .unwrap_or_default()
}

fn read_rings(value: &Value) -> Vec<Vec<GeodeticPoint>> {
    value
        .as_array()
        .map(|arr| arr.iter().map(read_positions).collect())
        .unwrap_or_default()
}

fn geometry_to_value(geom: &Geometry) -> Value {
    let coords = match geom {
        Geometry::Point(p) => position_value(p),
        Geometry::LineString(ps) => positions_value(ps),
        Geometry::MultiLineString(parts) | Geometry::Polygon(parts) => {
            Value::Array(parts.iter().map(|p| positions_value(p)).collect())
        }
    };
    let mut obj = Map::new();
    obj.insert(
        "type".to_string(),
        Value::String(geom.type_name().to_string()),
    );
    obj.insert("coordinates".to_string(), coords);
    Value::Object(obj)
}

fn position_value(p: &GeodeticPoint) -> Value {
    Value::Array(vec![Value::from(p.lon_deg), Value::from(p.lat_deg)])
}

fn positions_value(ps: &[GeodeticPoint]) -> Value {
    Value::Array(ps.iter().map(position_value).collect())
}
