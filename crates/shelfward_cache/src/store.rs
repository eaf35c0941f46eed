//! Durable cache tier.
//!
//! The durable tier is a plain key-value store holding JSON-serialized
//! cache entries. It is read lazily on memory misses, so cross-process
//! consistency is best-effort, last-write-wins.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the durable tier.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Cache store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A key-value store backing the cache's durable tier.
///
/// Keys arrive already namespaced with [`crate::DURABLE_PREFIX`].
/// Payloads are opaque JSON strings; the store must not interpret
/// them.
pub trait DurableStore: Send {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn write(&mut self, key: &str, payload: &str) -> Result<(), CacheError>;
    fn remove(&mut self, key: &str) -> Result<(), CacheError>;
    fn remove_prefix(&mut self, prefix: &str) -> Result<(), CacheError>;
}

/// Durable tier persisted as a single JSON object file.
///
/// Every operation reads the file fresh and writes it back whole,
/// which keeps the store last-write-wins across processes without any
/// locking. Suitable for the small entry counts a client cache holds.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, CacheError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let map: BTreeMap<String, Value> = serde_json::from_str(&raw)?;
        Ok(map
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect())
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, payload)?;
        Ok(())
    }
}

impl DurableStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.load()?.remove(key))
    }

    fn write(&mut self, key: &str, payload: &str) -> Result<(), CacheError> {
        let mut map = self.load()?;
        map.insert(key.to_string(), payload.to_string());
        self.save(&map)
    }

    fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }

    fn remove_prefix(&mut self, prefix: &str) -> Result<(), CacheError> {
        let mut map = self.load()?;
        let before = map.len();
        map.retain(|k, _| !k.starts_with(prefix));
        if map.len() != before {
            self.save(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope.json"));
        assert_eq!(store.read("k").unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("cache.json"));
        store.write("shelfward.cache.k", "{\"v\":1}").unwrap();
        assert_eq!(
            store.read("shelfward.cache.k").unwrap().as_deref(),
            Some("{\"v\":1}")
        );
    }

    #[test]
    fn test_remove_prefix_leaves_other_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("cache.json"));
        store.write("shelfward.cache.items.1", "a").unwrap();
        store.write("shelfward.cache.items.2", "b").unwrap();
        store.write("shelfward.cache.modules.1", "c").unwrap();

        store.remove_prefix("shelfward.cache.items.").unwrap();
        assert_eq!(store.read("shelfward.cache.items.1").unwrap(), None);
        assert_eq!(
            store.read("shelfward.cache.modules.1").unwrap().as_deref(),
            Some("c")
        );
    }
}
