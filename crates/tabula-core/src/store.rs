//! Flat key/value persistence
//!
//! Column aliases are persisted as flat `namespace/key -> value` string
//! entries. Two stores are provided:
//! - [`MemoryStore`]: process-local, used by tests and ephemeral sessions
//! - [`JsonFileStore`]: all entries in a SINGLE JSON object on disk, loaded
//!   lazily on first access and rewritten on every mutation

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{Result, TabulaError};

/// A flat string key/value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, in store order
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<IndexMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().shift_remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Store backed by one JSON file
pub struct JsonFileStore {
    path: PathBuf,
    /// Loaded on first access
    cache: RwLock<Option<IndexMap<String, String>>>,
}

impl JsonFileStore {
    /// Create a store for `path`. The file is not touched until first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        tracing::debug!(path = %path.display(), "json store initialized (entries loaded on demand)");
        Self {
            path,
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(&self) -> Result<IndexMap<String, String>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no store file found, starting fresh");
            return Ok(IndexMap::new());
        }

        let text = std::fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(IndexMap::new());
        }

        match serde_json::from_str::<IndexMap<String, String>>(&text) {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "loaded store entries from disk");
                Ok(entries)
            }
            Err(e) => Err(TabulaError::Store(format!(
                "failed to parse {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.cache.read().is_some() {
            return Ok(());
        }
        let entries = self.load_from_disk()?;
        let mut cache = self.cache.write();
        if cache.is_none() {
            *cache = Some(entries);
        }
        Ok(())
    }

    fn write_to_disk(&self, entries: &IndexMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut IndexMap<String, String>)) -> Result<()> {
        self.ensure_loaded()?;
        let mut cache = self.cache.write();
        let entries = cache.get_or_insert_with(IndexMap::new);
        f(entries);
        self.write_to_disk(entries)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_loaded()?;
        Ok(self
            .cache
            .read()
            .as_ref()
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.shift_remove(key);
        })
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        Ok(self
            .cache
            .read()
            .as_ref()
            .map(|entries| {
                entries
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_store_prefix_listing() {
        let store = MemoryStore::new();
        store.set("aliases/a", "A").unwrap();
        store.set("other/b", "B").unwrap();
        store.set("aliases/c", "C").unwrap();

        assert_eq!(
            store.keys_with_prefix("aliases/").unwrap(),
            vec!["aliases/a".to_string(), "aliases/c".to_string()]
        );
        store.remove("aliases/a").unwrap();
        assert_eq!(store.get("aliases/a").unwrap(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::new(&path);
        store.set("ns/name", "Customer Name").unwrap();
        store.set("ns/city", "City").unwrap();
        store.remove("ns/city").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("ns/name").unwrap(),
            Some("Customer Name".to_string())
        );
        assert_eq!(reopened.get("ns/city").unwrap(), None);
    }

    #[test]
    fn test_json_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("x"), Err(TabulaError::Store(_))));
    }
}
