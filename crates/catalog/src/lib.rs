//! Client-side cache for transit API responses.
//!
//! Entries are keyed by a hash of the canonical query and expire after a few
//! days. A response that produced no lines is never written, so an outage or
//! an empty answer cannot pin "no data" for the whole expiry window.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Seven days.
pub const DEFAULT_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    /// Canonical query text the key was derived from.
    pub query: String,
    /// GeoJSON FeatureCollection, serialized.
    pub payload: String,
    pub line_count: usize,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    Io(String),
    Encode(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Io(msg) => write!(f, "cache storage error: {msg}"),
            CacheError::Encode(msg) => write!(f, "cache entry could not be encoded: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

pub trait CacheStore {
    fn list(&self) -> Result<Vec<CacheEntry>, CacheError>;
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    fn upsert(&mut self, entry: CacheEntry) -> Result<(), CacheError>;
    fn delete(&mut self, key: &str) -> Result<bool, CacheError>;
}

/// Storage key for a canonical query string.
pub fn key_for_query(canonical_query: &str) -> String {
    format!("transit.{}", blake3::hash(canonical_query.as_bytes()).to_hex())
}

#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    snapshot: CacheSnapshot,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for InMemoryCacheStore {
    fn list(&self) -> Result<Vec<CacheEntry>, CacheError> {
        Ok(self.snapshot.entries.values().cloned().collect())
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.snapshot.entries.get(key).cloned())
    }

    fn upsert(&mut self, entry: CacheEntry) -> Result<(), CacheError> {
        self.snapshot.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool, CacheError> {
        Ok(self.snapshot.entries.remove(key).is_some())
    }
}

/// Expiry and "never cache empty" policy on top of any [`CacheStore`].
#[derive(Debug)]
pub struct TransitCache<S> {
    store: S,
    ttl_ms: u64,
}

impl<S: CacheStore> TransitCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, DEFAULT_TTL_MS)
    }

    pub fn with_ttl(store: S, ttl_ms: u64) -> Self {
        Self { store, ttl_ms }
    }

    pub fn store_ref(&self) -> &S {
        &self.store
    }

    /// Fresh entry for `canonical_query`, if any. Expired entries are removed.
    pub fn lookup(
        &mut self,
        canonical_query: &str,
        now_ms: u64,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let key = key_for_query(canonical_query);
        let Some(entry) = self.store.get(&key)? else {
            return Ok(None);
        };
        if entry.is_expired(now_ms) || entry.query != canonical_query {
            self.store.delete(&key)?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Records a response. Returns `false` (and writes nothing) when the
    /// response has no lines.
    pub fn insert(
        &mut self,
        canonical_query: &str,
        payload: String,
        line_count: usize,
        now_ms: u64,
    ) -> Result<bool, CacheError> {
        if line_count == 0 {
            return Ok(false);
        }
        self.store.upsert(CacheEntry {
            key: key_for_query(canonical_query),
            query: canonical_query.to_string(),
            payload,
            line_count,
            created_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(self.ttl_ms),
        })?;
        Ok(true)
    }

    pub fn purge_expired(&mut self, now_ms: u64) -> Result<usize, CacheError> {
        let mut removed = 0;
        for entry in self.store.list()? {
            if entry.is_expired(now_ms) && self.store.delete(&entry.key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

mod file_storage {
    use std::path::{Path, PathBuf};

    use tracing::warn;

    use super::{CacheEntry, CacheError, CacheSnapshot, CacheStore};

    /// Whole-snapshot JSON file, rewritten atomically on every change.
    ///
    /// The file is a handful of entries, so reads and writes are plain
    /// blocking `std::fs` calls; async callers move them off the runtime.
    #[derive(Debug)]
    pub struct FileCacheStore {
        path: PathBuf,
    }

    impl FileCacheStore {
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// An unreadable snapshot is a cache miss; the next save replaces it.
        fn load(&self) -> Result<CacheSnapshot, CacheError> {
            let raw = match std::fs::read_to_string(&self.path) {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(CacheSnapshot::default());
                }
                Err(e) => return Err(CacheError::Io(e.to_string())),
            };
            if raw.trim().is_empty() {
                return Ok(CacheSnapshot::default());
            }
            match serde_json::from_str(&raw) {
                Ok(snapshot) => Ok(snapshot),
                Err(e) => {
                    warn!("discarding corrupt cache file {:?}: {e}", self.path);
                    Ok(CacheSnapshot::default())
                }
            }
        }

        fn save(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| CacheError::Io(e.to_string()))?;
                }
            }
            let tmp = self.path.with_extension("json.tmp");
            let text = serde_json::to_string_pretty(snapshot)
                .map_err(|e| CacheError::Encode(e.to_string()))?;
            std::fs::write(&tmp, text).map_err(|e| CacheError::Io(e.to_string()))?;
            std::fs::rename(&tmp, &self.path).map_err(|e| CacheError::Io(e.to_string()))?;
            Ok(())
        }
    }

    impl CacheStore for FileCacheStore {
        fn list(&self) -> Result<Vec<CacheEntry>, CacheError> {
            Ok(self.load()?.entries.into_values().collect())
        }

        fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Ok(self.load()?.entries.remove(key))
        }

        fn upsert(&mut self, entry: CacheEntry) -> Result<(), CacheError> {
            let mut snapshot = self.load()?;
            snapshot.entries.insert(entry.key.clone(), entry);
            self.save(&snapshot)
        }

        fn delete(&mut self, key: &str) -> Result<bool, CacheError> {
            let mut snapshot = self.load()?;
            let existed = snapshot.entries.remove(key).is_some();
            if existed {
                self.save(&snapshot)?;
            }
            Ok(existed)
        }
    }
}

pub use file_storage::FileCacheStore;
