//! Live metro routes from the Transitland REST API.
//!
//! Each route becomes one LineString feature carrying `name` and `color`,
//! ready for the ordinary line parser. Responses are cached per query with a
//! multi-day expiry; a response without routes is never cached.

use std::sync::Arc;

use catalog::{CacheStore, TransitCache};
use formats::{
    read_geometry, CityConfig, CitySources, Feature, FeatureCollection, Geometry, TransitQuery,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use streaming::{BoxFuture, MetroSource, RawCityData, SourceError};
use tracing::{debug, info, warn};

pub const ROUTES_URL: &str = "https://transit.land/api/v2/rest/routes";
/// GTFS route type for subway/metro.
pub const METRO_ROUTE_TYPE: u32 = 1;
pub const ROUTE_LIMIT: u32 = 50;
pub const FALLBACK_ROUTE_COLOR: &str = "#00FFFF";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub onestop_id: Option<String>,
    #[serde(default)]
    pub route_color: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub geometry: Option<Value>,
}

impl Route {
    pub fn color(&self) -> String {
        match self.route_color.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => format!("#{}", c.trim_start_matches('#')),
            _ => FALLBACK_ROUTE_COLOR.to_string(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        [&self.route_long_name, &self.route_short_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

/// Query-string pairs for one routes request, excluding the API key.
pub fn query_params(query: &TransitQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("include_geometry", "true".to_string()),
        ("route_type", METRO_ROUTE_TYPE.to_string()),
        ("limit", ROUTE_LIMIT.to_string()),
    ];
    match query {
        TransitQuery::Operator { onestop_id } => {
            params.push(("operator_onestop_id", onestop_id.clone()))
        }
        TransitQuery::BoundingBox { bbox } => params.push(("bbox", bbox.to_query_param())),
    }
    params
}

/// Converts routes to line features. Multi-part geometry yields one feature
/// per part; routes without line geometry are skipped.
pub fn routes_to_features(routes: &[Route]) -> FeatureCollection {
    let mut features = Vec::new();
    for route in routes {
        let parts = match route.geometry.as_ref().and_then(read_geometry) {
            Some(Geometry::LineString(points)) => vec![points],
            Some(Geometry::MultiLineString(parts)) => parts,
            _ => continue,
        };
        let single = parts.len() == 1;
        for (i, points) in parts.into_iter().enumerate() {
            let mut feature =
                Feature::new(Geometry::LineString(points)).with_property("color", route.color());
            if let Some(name) = route.name() {
                feature = feature.with_property("name", name);
            }
            feature.id = route.onestop_id.as_ref().map(|id| {
                if single {
                    id.clone()
                } else {
                    format!("{id}#{i}")
                }
            });
            features.push(feature);
        }
    }
    FeatureCollection::new(features)
}

pub fn parse_routes_response(body: &str) -> Result<FeatureCollection, SourceError> {
    let response: RoutesResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::with_source("invalid Transitland response", e))?;
    Ok(routes_to_features(&response.routes))
}

pub struct TransitlandSource<S> {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    cache: Arc<Mutex<TransitCache<S>>>,
}

impl<S: CacheStore + Send + 'static> TransitlandSource<S> {
    pub fn new(api_key: impl Into<String>, cache: TransitCache<S>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: ROUTES_URL.to_string(),
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn cache(&self) -> &Arc<Mutex<TransitCache<S>>> {
        &self.cache
    }

    /// Store access may hit the filesystem, so it runs on the blocking pool.
    async fn cached(&self, canonical: &str, now_ms: u64) -> Option<FeatureCollection> {
        let cache = Arc::clone(&self.cache);
        let key = canonical.to_string();
        let lookup = tokio::task::spawn_blocking(move || cache.lock().lookup(&key, now_ms)).await;
        let entry = match lookup {
            Ok(Ok(entry)) => entry?,
            Ok(Err(err)) => {
                warn!("transit cache lookup failed: {err}");
                return None;
            }
            Err(err) => {
                warn!("transit cache lookup did not finish: {err}");
                return None;
            }
        };
        match FeatureCollection::from_geojson_str(&entry.payload) {
            Ok(collection) => Some(collection),
            Err(err) => {
                warn!("dropping unreadable cache entry for {canonical}: {err}");
                None
            }
        }
    }

    async fn remember(&self, canonical: &str, collection: &FeatureCollection, now_ms: u64) {
        let cache = Arc::clone(&self.cache);
        let key = canonical.to_string();
        let payload = collection.to_geojson_value().to_string();
        let lines = collection.len();
        let write = tokio::task::spawn_blocking(move || {
            cache.lock().insert(&key, payload, lines, now_ms)
        })
        .await;
        match write {
            Ok(Ok(true)) => debug!("cached {lines} lines for {canonical}"),
            Ok(Ok(false)) => debug!("not caching empty result for {canonical}"),
            Ok(Err(err)) => warn!("transit cache write failed: {err}"),
            Err(err) => warn!("transit cache write did not finish: {err}"),
        }
    }

    /// Routes for `query`, from cache when fresh.
    pub async fn fetch_routes(
        &self,
        query: &TransitQuery,
    ) -> Result<FeatureCollection, SourceError> {
        let canonical = query.canonical();
        let now_ms = foundation::now_unix_ms();
        if let Some(collection) = self.cached(&canonical, now_ms).await {
            info!("transit cache hit for {canonical}");
            return Ok(collection);
        }

        info!("fetching metro routes for {canonical}");
        let resp = self
            .client
            .get(&self.base_url)
            .header("apikey", &self.api_key)
            .query(&query_params(query))
            .send()
            .await
            .map_err(|e| SourceError::with_source("HTTP request failed", e))?;

        if !resp.status().is_success() {
            return Err(SourceError::new(format!("HTTP error: {}", resp.status())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::with_source("Failed to read response", e))?;
        let collection = parse_routes_response(&body)?;
        self.remember(&canonical, &collection, now_ms).await;
        Ok(collection)
    }
}

impl<S: CacheStore + Send + 'static> MetroSource for TransitlandSource<S> {
    fn name(&self) -> &str {
        "transitland"
    }

    fn fetch(&self, city: &CityConfig) -> BoxFuture<'_, Result<RawCityData, SourceError>> {
        let query = match &city.sources {
            CitySources::Live { query } => Ok(query.clone()),
            CitySources::Files { .. } => Err(SourceError::new(format!(
                "{} is not configured for live data",
                city.id
            ))),
        };
        Box::pin(async move {
            let lines = self.fetch_routes(&query?).await?;
            // The routes endpoint has no stations or buildings.
            Ok(RawCityData {
                lines,
                ..RawCityData::default()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_routes_response, query_params, routes_to_features, Route, TransitlandSource,
    };
    use catalog::{CacheStore, InMemoryCacheStore, TransitCache};
    use formats::{BoundingBox, CityTable, Geometry, TransitQuery};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use streaming::MetroSource;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Nothing listens on the discard port, so any request fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9/routes";

    const ONE_ROUTE: &str = r#"{"routes":[{"onestop_id":"r-purple","route_color":"800080",
        "route_long_name":"Purple Line","geometry":{"type":"LineString",
        "coordinates":[[88.30,22.50],[88.40,22.60]]}}]}"#;

    fn kolkata_query() -> TransitQuery {
        TransitQuery::BoundingBox {
            bbox: BoundingBox::new(88.20, 22.40, 88.55, 22.75),
        }
    }

    /// Answers a single HTTP request with `body` and hands back the raw
    /// request text.
    async fn serve_once(body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}/routes"), handle)
    }

    fn cached_keys(source: &TransitlandSource<InMemoryCacheStore>) -> usize {
        source.cache().lock().store_ref().list().expect("list").len()
    }

    #[tokio::test]
    async fn fresh_cache_entry_is_served_without_a_request() {
        let query = kolkata_query();
        let lines = parse_routes_response(ONE_ROUTE).expect("routes");
        let mut cache = TransitCache::new(InMemoryCacheStore::new());
        cache
            .insert(
                &query.canonical(),
                lines.to_geojson_value().to_string(),
                lines.len(),
                foundation::now_unix_ms(),
            )
            .expect("insert");

        let source = TransitlandSource::new("secret", cache).with_base_url(UNREACHABLE);
        let served = source.fetch_routes(&query).await.expect("cache hit");
        assert_eq!(served, lines);

        let other = TransitQuery::Operator {
            onestop_id: "o-unknown".to_string(),
        };
        let err = source.fetch_routes(&other).await.expect_err("miss goes to network");
        assert_eq!(err.message, "HTTP request failed");
    }

    #[tokio::test]
    async fn empty_response_is_returned_but_not_cached() {
        let (url, server) = serve_once(r#"{"routes":[]}"#).await;
        let source = TransitlandSource::new("secret", TransitCache::new(InMemoryCacheStore::new()))
            .with_base_url(url);

        let lines = source.fetch_routes(&kolkata_query()).await.expect("fetch");
        assert!(lines.is_empty());
        assert_eq!(cached_keys(&source), 0);

        let request = server.await.expect("server");
        assert!(request.starts_with("GET /routes?"));
        assert!(request.contains("include_geometry=true"));
        assert!(request.contains("route_type=1"));
        assert!(request.contains("bbox="));
        assert!(request.to_ascii_lowercase().contains("apikey: secret"));
    }

    #[tokio::test]
    async fn routes_are_cached_for_the_next_load() {
        let (url, server) = serve_once(ONE_ROUTE).await;
        let source = TransitlandSource::new("secret", TransitCache::new(InMemoryCacheStore::new()))
            .with_base_url(url);
        let table = CityTable::builtin();
        let kolkata = table.get("kolkata").expect("kolkata");

        let first = source.fetch(kolkata).await.expect("first load");
        server.await.expect("server");
        assert_eq!(first.lines.len(), 1);
        assert!(first.stations.is_empty());
        assert_eq!(cached_keys(&source), 1);

        // The stub has shut down; only the cache can answer now.
        let second = source.fetch(kolkata).await.expect("second load");
        assert_eq!(second.lines, first.lines);
    }

    #[test]
    fn params_filter_to_metro_with_geometry() {
        let params = query_params(&TransitQuery::BoundingBox {
            bbox: BoundingBox::new(88.2, 22.4, 88.55, 22.75),
        });
        assert_eq!(
            params,
            vec![
                ("include_geometry", "true".to_string()),
                ("route_type", "1".to_string()),
                ("limit", "50".to_string()),
                ("bbox", BoundingBox::new(88.2, 22.4, 88.55, 22.75).to_query_param()),
            ]
        );

        let op = query_params(&TransitQuery::Operator {
            onestop_id: "o-ttn-dmrc".to_string(),
        });
        assert_eq!(op[3], ("operator_onestop_id", "o-ttn-dmrc".to_string()));
    }

    #[test]
    fn route_colour_and_name_fallbacks() {
        let bare = Route::default();
        assert_eq!(bare.color(), "#00FFFF");
        assert_eq!(bare.name(), None);

        let route = Route {
            route_color: Some("ffc520".to_string()),
            route_long_name: Some("".to_string()),
            route_short_name: Some("Yellow".to_string()),
            ..Route::default()
        };
        assert_eq!(route.color(), "#ffc520");
        assert_eq!(route.name(), Some("Yellow"));
    }

    #[test]
    fn multi_part_routes_split_into_lines() {
        let body = json!({
            "routes": [
                {
                    "onestop_id": "r-blue",
                    "route_color": "0000FF",
                    "route_long_name": "Blue Line",
                    "geometry": {
                        "type": "MultiLineString",
                        "coordinates": [
                            [[77.0, 28.5], [77.1, 28.6]],
                            [[77.1, 28.6], [77.2, 28.7]]
                        ]
                    }
                },
                { "onestop_id": "r-none", "route_long_name": "No geometry" },
                {
                    "route_short_name": "Pink",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[77.3, 28.5], [77.4, 28.6]]
                    }
                }
            ]
        })
        .to_string();

        let collection = parse_routes_response(&body).expect("parses");
        assert_eq!(collection.len(), 3);
        let ids: Vec<Option<&str>> = collection.features.iter().map(|f| f.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("r-blue#0"), Some("r-blue#1"), None]);
        assert_eq!(
            collection.features[2].first_str_property(&["color"]),
            Some("#00FFFF")
        );
        assert!(matches!(
            collection.features[0].geometry,
            Some(Geometry::LineString(ref pts)) if pts.len() == 2
        ));
    }

    #[test]
    fn empty_or_missing_routes_is_an_empty_collection() {
        assert!(parse_routes_response("{}").expect("ok").is_empty());
        assert!(routes_to_features(&[]).is_empty());
        assert!(parse_routes_response("<html>").is_err());
    }
}
