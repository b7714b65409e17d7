//! Supported cities: anchor, data sources and basemap view.

use foundation::math::GeodeticPoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub lon: f64,
    pub lat: f64,
}

impl Anchor {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn to_geodetic(self) -> GeodeticPoint {
        GeodeticPoint::new(self.lon, self.lat)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lon < self.max_lon
            && self.min_lat < self.max_lat
            && self.min_lat >= -90.0
            && self.max_lat <= 90.0
    }

    /// `minLon,minLat,maxLon,maxLat`, the order transit APIs expect.
    pub fn to_query_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }

    pub fn contains(&self, p: GeodeticPoint) -> bool {
        p.lon_deg >= self.min_lon
            && p.lon_deg <= self.max_lon
            && p.lat_deg >= self.min_lat
            && p.lat_deg <= self.max_lat
    }
}

/// Query against the live transit data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum TransitQuery {
    Operator { onestop_id: String },
    BoundingBox { bbox: BoundingBox },
}

impl TransitQuery {
    /// Canonical text form; equal queries produce equal strings.
    pub fn canonical(&self) -> String {
        match self {
            TransitQuery::Operator { onestop_id } => format!("operator:{onestop_id}"),
            TransitQuery::BoundingBox { bbox } => format!("bbox:{}", bbox.to_query_param()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CitySources {
    /// Static GeoJSON files relative to the data directory.
    Files {
        lines: String,
        stations: String,
        #[serde(default)]
        buildings: Option<String>,
    },
    /// Lines from the transit API; no station or building data.
    Live { query: TransitQuery },
}

/// Basemap camera for the georeferenced map mode.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    pub id: String,
    pub name: String,
    pub label: String,
    pub anchor: Anchor,
    pub sources: CitySources,
    #[serde(default)]
    pub view: Option<MapView>,
}

impl CityConfig {
    /// Map view centred on the anchor when none is configured.
    pub fn map_view(&self) -> MapView {
        self.view.unwrap_or(MapView {
            longitude: self.anchor.lon,
            latitude: self.anchor.lat,
            zoom: 11.0,
            pitch: 60.0,
            bearing: 0.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CityConfigError {
    UnknownCity(String),
    Json(String),
    Invalid(String),
}

impl std::fmt::Display for CityConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CityConfigError::UnknownCity(id) => write!(f, "unknown city: {id}"),
            CityConfigError::Json(msg) => write!(f, "city table is not valid JSON: {msg}"),
            CityConfigError::Invalid(msg) => write!(f, "invalid city table: {msg}"),
        }
    }
}

impl std::error::Error for CityConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct CityTable {
    cities: Vec<CityConfig>,
}

impl CityTable {
    pub fn new(cities: Vec<CityConfig>) -> Result<Self, CityConfigError> {
        if cities.is_empty() {
            return Err(CityConfigError::Invalid("no cities configured".to_string()));
        }
        for (i, city) in cities.iter().enumerate() {
            if city.id.trim().is_empty() {
                return Err(CityConfigError::Invalid(format!("city {i} has an empty id")));
            }
            if cities[..i].iter().any(|c| c.id == city.id) {
                return Err(CityConfigError::Invalid(format!("duplicate city id: {}", city.id)));
            }
            let lat = city.anchor.lat;
            if !city.anchor.lon.is_finite() || !lat.is_finite() || lat <= -90.0 || lat >= 90.0 {
                return Err(CityConfigError::Invalid(format!(
                    "city {} has an anchor outside the projectable range",
                    city.id
                )));
            }
            if let CitySources::Live {
                query: TransitQuery::BoundingBox { bbox },
            } = &city.sources
            {
                if !bbox.is_valid() {
                    return Err(CityConfigError::Invalid(format!(
                        "city {} has an invalid bounding box",
                        city.id
                    )));
                }
            }
        }
        Ok(Self { cities })
    }

    pub fn from_json_str(payload: &str) -> Result<Self, CityConfigError> {
        let cities: Vec<CityConfig> =
            serde_json::from_str(payload).map_err(|e| CityConfigError::Json(e.to_string()))?;
        Self::new(cities)
    }

    pub fn get(&self, id: &str) -> Result<&CityConfig, CityConfigError> {
        self.cities
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CityConfigError::UnknownCity(id.to_string()))
    }

    pub fn cities(&self) -> &[CityConfig] {
        &self.cities
    }

    /// The city shown at start-up.
    pub fn default_city(&self) -> &CityConfig {
        &self.cities[0]
    }

    /// Static-file cities plus a few live bounding-box cities.
    pub fn builtin() -> Self {
        Self {
            cities: vec![
                files_city(
                    "delhi",
                    "Delhi Metro",
                    "DEL",
                    Anchor::new(77.209, 28.6139), // Connaught Place
                    "delhi",
                    true,
                ),
                files_city(
                    "mumbai",
                    "Mumbai Metro",
                    "BOM",
                    Anchor::new(72.8777, 19.076), // BKC
                    "mumbai",
                    false,
                ),
                files_city(
                    "bangalore",
                    "Namma Metro",
                    "BLR",
                    Anchor::new(77.5946, 12.9716), // Cubbon Park
                    "bangalore",
                    false,
                ),
                live_city(
                    "kolkata",
                    "Kolkata Metro",
                    "CCU",
                    Anchor::new(88.3639, 22.5726),
                    BoundingBox::new(88.20, 22.40, 88.55, 22.75),
                ),
                live_city(
                    "chennai",
                    "Chennai Metro",
                    "MAA",
                    Anchor::new(80.2707, 13.0827),
                    BoundingBox::new(80.10, 12.90, 80.35, 13.25),
                ),
                live_city(
                    "hyderabad",
                    "Hyderabad Metro",
                    "HYD",
                    Anchor::new(78.4867, 17.385),
                    BoundingBox::new(78.30, 17.30, 78.65, 17.55),
                ),
            ],
        }
    }
}

fn files_city(
    id: &str,
    name: &str,
    label: &str,
    anchor: Anchor,
    stem: &str,
    with_buildings: bool,
) -> CityConfig {
    CityConfig {
        id: id.to_string(),
        name: name.to_string(),
        label: label.to_string(),
        anchor,
        sources: CitySources::Files {
            lines: format!("{stem}_metro.geojson"),
            stations: format!("{stem}_stations.geojson"),
            buildings: with_buildings.then(|| format!("{stem}_buildings.geojson")),
        },
        view: None,
    }
}

fn live_city(id: &str, name: &str, label: &str, anchor: Anchor, bbox: BoundingBox) -> CityConfig {
    CityConfig {
        id: id.to_string(),
        name: name.to_string(),
        label: label.to_string(),
        anchor,
        sources: CitySources::Live {
            query: TransitQuery::BoundingBox { bbox },
        },
        view: None,
    }
}
