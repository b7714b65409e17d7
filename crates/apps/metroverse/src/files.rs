//! GeoJSON files on disk, resolved against the data directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use formats::{CityConfig, CitySources, FeatureCollection};
use futures_util::future::join3;
use streaming::{BoxFuture, MetroSource, RawCityData, SourceError};
use tracing::{debug, warn};

pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

async fn read_collection(path: &Path) -> Result<FeatureCollection, SourceError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SourceError::with_source(format!("failed to read {}", path.display()), e))?;
    FeatureCollection::from_geojson_str(&text)
        .map_err(|e| SourceError::with_source(format!("failed to parse {}", path.display()), e))
}

/// Buildings are decoration: a missing or unreadable file means no buildings.
async fn read_optional(path: Option<PathBuf>) -> Option<FeatureCollection> {
    let path = path?;
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => match FeatureCollection::from_geojson_str(&text) {
            Ok(collection) => Some(collection),
            Err(err) => {
                warn!("ignoring unparseable buildings file {path:?}: {err}");
                None
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no buildings file at {path:?}");
            None
        }
        Err(err) => {
            warn!("ignoring unreadable buildings file {path:?}: {err}");
            None
        }
    }
}

impl MetroSource for FileSource {
    fn name(&self) -> &str {
        "files"
    }

    fn fetch(&self, city: &CityConfig) -> BoxFuture<'_, Result<RawCityData, SourceError>> {
        let paths = match &city.sources {
            CitySources::Files {
                lines,
                stations,
                buildings,
            } => Ok((
                self.root.join(lines),
                self.root.join(stations),
                buildings.as_ref().map(|b| self.root.join(b)),
            )),
            CitySources::Live { .. } => Err(SourceError::new(format!(
                "{} has no static data files",
                city.id
            ))),
        };
        Box::pin(async move {
            let (lines_path, stations_path, buildings_path) = paths?;
            let (lines, stations, buildings) = join3(
                read_collection(&lines_path),
                read_collection(&stations_path),
                read_optional(buildings_path),
            )
            .await;
            Ok(RawCityData {
                lines: lines?,
                stations: stations?,
                buildings,
            })
        })
    }
}
