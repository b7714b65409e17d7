//! Where raw city data comes from.
//!
//! A [`MetroSource`] turns a [`CityConfig`] into the three GeoJSON payloads a
//! city needs. [`fetch_scene`] runs a source and parses the result into a
//! complete [`SceneSnapshot`]; nothing partial ever leaves this module.

use std::future::Future;
use std::pin::Pin;

use formats::{
    CityConfig, FeatureCollection, ParseOptions, parse_buildings, parse_lines,
    parse_stations_with,
};
use foundation::math::LocalFrame;
use scene::SceneSnapshot;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for source operations.
#[derive(Debug)]
pub struct SourceError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Unparsed payloads for one city.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCityData {
    pub lines: FeatureCollection,
    pub stations: FeatureCollection,
    pub buildings: Option<FeatureCollection>,
}

/// Trait for metro data providers.
///
/// Implementations may fetch lines, stations and buildings concurrently but
/// must resolve to all of them or to an error.
pub trait MetroSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, city: &CityConfig) -> BoxFuture<'_, Result<RawCityData, SourceError>>;
}

/// Parses raw payloads in the city's local frame.
pub fn build_snapshot(
    city: &CityConfig,
    raw: &RawCityData,
    options: ParseOptions,
) -> Result<SceneSnapshot, SourceError> {
    let frame = LocalFrame::new(city.anchor.to_geodetic())
        .map_err(|e| SourceError::with_source(format!("invalid anchor for {}", city.id), e))?;
    Ok(SceneSnapshot {
        city_id: city.id.clone(),
        lines: parse_lines(&raw.lines, &frame),
        stations: parse_stations_with(&raw.stations, &frame, &options),
        buildings: raw
            .buildings
            .as_ref()
            .map(|b| parse_buildings(b, &frame))
            .unwrap_or_default(),
    })
}

/// Fetches and parses one city.
pub async fn fetch_scene(
    source: &dyn MetroSource,
    city: &CityConfig,
    options: ParseOptions,
) -> Result<SceneSnapshot, SourceError> {
    let raw = source.fetch(city).await?;
    build_snapshot(city, &raw, options)
}

/// Source backed by in-memory payloads, keyed by city id.
#[derive(Debug, Default)]
pub struct StaticSource {
    cities: std::collections::BTreeMap<String, RawCityData>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(mut self, city_id: impl Into<String>, data: RawCityData) -> Self {
        self.cities.insert(city_id.into(), data);
        self
    }
}

impl MetroSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, city: &CityConfig) -> BoxFuture<'_, Result<RawCityData, SourceError>> {
        let found = self.cities.get(&city.id).cloned();
        let id = city.id.clone();
        Box::pin(async move { found.ok_or_else(|| SourceError::new(format!("no data for {id}"))) })
    }
}

#[cfg(test)]
mod tests {
    use super::{MetroSource, RawCityData, StaticSource, build_snapshot, fetch_scene};
    use formats::{CityTable, Feature, FeatureCollection, Geometry, ParseOptions};
    use foundation::math::GeodeticPoint;
    use pretty_assertions::assert_eq;

    fn delhi_raw() -> RawCityData {
        RawCityData {
            lines: FeatureCollection::new(vec![
                Feature::new(Geometry::LineString(vec![
                    GeodeticPoint::new(77.0, 28.5),
                    GeodeticPoint::new(77.5, 28.7),
                ]))
                .with_property("color", "#FFC520"),
            ]),
            stations: FeatureCollection::new(vec![
                Feature::new(Geometry::Point(GeodeticPoint::new(77.209, 28.6139)))
                    .with_property("name", "Rajiv Chowk"),
            ]),
            buildings: None,
        }
    }

    #[test]
    fn snapshot_is_built_in_the_city_frame() {
        let table = CityTable::builtin();
        let city = table.get("delhi").expect("delhi");
        let snapshot = build_snapshot(city, &delhi_raw(), ParseOptions::default()).expect("ok");

        assert_eq!(snapshot.city_id, "delhi");
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].elevation, -8.0);
        assert_eq!(snapshot.stations[0].name, "Rajiv Chowk");
        assert!(snapshot.stations[0].position.x.abs() < 1e-9);
        assert!(snapshot.buildings.is_empty());
    }

    #[tokio::test]
    async fn static_source_serves_known_cities_only() {
        let table = CityTable::builtin();
        let source = StaticSource::new().with_city("delhi", delhi_raw());
        assert_eq!(source.name(), "static");

        let delhi = table.get("delhi").expect("delhi");
        let snapshot = fetch_scene(&source, delhi, ParseOptions::default())
            .await
            .expect("delhi loads");
        assert_eq!(snapshot.lines.len(), 1);

        let mumbai = table.get("mumbai").expect("mumbai");
        let err = fetch_scene(&source, mumbai, ParseOptions::default())
            .await
            .expect_err("mumbai missing");
        assert_eq!(err.to_string(), "no data for mumbai");
    }
}
