//! Environment configuration.
//!
//! Every key is optional at start-up. A subsystem that needs a missing key
//! reports [`ConfigError`] when it is used; the rest of the app keeps working.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "public";
pub const DEFAULT_CACHE_PATH: &str = ".metroverse/cache.json";
pub const DEFAULT_CHAT_MODEL: &str = "meta-llama/llama-3.2-3b-instruct";
pub const MAP_STYLE_BASE: &str = "https://api.maptiler.com/maps/dataviz-dark/style.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingKey(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingKey(var) => write!(f, "missing {var} in environment"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub cache_path: PathBuf,
    pub chat_model: String,
    transitland_key: Option<String>,
    openrouter_key: Option<String>,
    maptiler_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            data_dir: PathBuf::from(
                get("METROVERSE_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            cache_path: PathBuf::from(
                get("METROVERSE_CACHE").unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string()),
            ),
            chat_model: get("METROVERSE_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            transitland_key: get("TRANSITLAND_KEY"),
            openrouter_key: get("OPENROUTER_API_KEY"),
            maptiler_key: get("MAPTILER_KEY"),
        }
    }

    pub fn transitland_key(&self) -> Result<&str, ConfigError> {
        self.transitland_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("TRANSITLAND_KEY"))
    }

    pub fn openrouter_key(&self) -> Result<&str, ConfigError> {
        self.openrouter_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("OPENROUTER_API_KEY"))
    }

    /// Basemap style for the georeferenced map mode.
    pub fn map_style_url(&self) -> Result<String, ConfigError> {
        let key = self
            .maptiler_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("MAPTILER_KEY"))?;
        Ok(format!("{MAP_STYLE_BASE}?key={key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg.data_dir, PathBuf::from("public"));
        assert_eq!(cfg.cache_path, PathBuf::from(".metroverse/cache.json"));
        assert_eq!(cfg.chat_model, "meta-llama/llama-3.2-3b-instruct");
    }

    #[test]
    fn missing_keys_fail_only_their_subsystem() {
        let cfg = config(&[("TRANSITLAND_KEY", "tl"), ("OPENROUTER_API_KEY", "  ")]);
        assert_eq!(cfg.transitland_key(), Ok("tl"));
        assert_eq!(
            cfg.openrouter_key(),
            Err(ConfigError::MissingKey("OPENROUTER_API_KEY"))
        );
        assert_eq!(
            cfg.map_style_url().map_err(|e| e.to_string()),
            Err("missing MAPTILER_KEY in environment".to_string())
        );
    }

    #[test]
    fn map_style_url_carries_the_key() {
        let cfg = config(&[("MAPTILER_KEY", "abc123")]);
        assert_eq!(
            cfg.map_style_url().expect("url"),
            "https://api.maptiler.com/maps/dataviz-dark/style.json?key=abc123"
        );
    }
}
