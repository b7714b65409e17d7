pub mod chat;
pub mod config;
pub mod files;
pub mod transitland;

use catalog::{FileCacheStore, TransitCache};
use formats::{CityConfig, CitySources};
use streaming::MetroSource;

use crate::config::{AppConfig, ConfigError};
use crate::files::FileSource;
use crate::transitland::TransitlandSource;

/// Picks the source a city's data comes from. Live cities need
/// `TRANSITLAND_KEY`; static cities never do.
pub fn source_for(
    city: &CityConfig,
    config: &AppConfig,
) -> Result<Box<dyn MetroSource>, ConfigError> {
    match city.sources {
        CitySources::Files { .. } => Ok(Box::new(FileSource::new(&config.data_dir))),
        CitySources::Live { .. } => {
            let key = config.transitland_key()?;
            let cache = TransitCache::new(FileCacheStore::new(&config.cache_path));
            Ok(Box::new(TransitlandSource::new(key, cache)))
        }
    }
}
