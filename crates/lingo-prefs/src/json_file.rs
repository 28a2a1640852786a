//! Preferences persisted as a single JSON object on disk.

use crate::error::{PrefsError, PrefsResult};
use crate::store::PrefsStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// File-backed preference store.
///
/// The whole map is kept in memory and rewritten on every change. Writes go
/// to a sibling temp file first and are renamed into place.
#[derive(Debug)]
pub struct JsonFilePrefs {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl JsonFilePrefs {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file starts empty. A file that fails to parse is logged
    /// and treated as empty; it is overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> PrefsResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(values) => values,
                Err(e) => {
                    log::warn!("Discarding unreadable preferences at {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the map and swap it in once it is on disk.
    ///
    /// `change` returns false when nothing changed and no write is needed.
    /// A failed write leaves both the file and the in-memory map as they were.
    fn update<F>(&self, change: F) -> PrefsResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) -> bool,
    {
        let mut values = self.values.write().map_err(|_| PrefsError::Poisoned)?;
        let mut next = values.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> PrefsResult<()> {
        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PrefsStore for JsonFilePrefs {
    fn get(&self, key: &str) -> PrefsResult<Option<Value>> {
        let values = self.values.read().map_err(|_| PrefsError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> PrefsResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&self, key: &str) -> PrefsResult<()> {
        self.update(|values| values.remove(key).is_some())
    }

    fn keys(&self) -> PrefsResult<Vec<String>> {
        let values = self.values.read().map_err(|_| PrefsError::Poisoned)?;
        Ok(values.keys().cloned().collect())
    }

    fn clear(&self) -> PrefsResult<()> {
        self.update(|values| {
            values.clear();
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PrefsStoreExt;
    use tempfile::TempDir;

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs").join("lingo.json");

        {
            let store = JsonFilePrefs::open(&path).unwrap();
            store.put_i64("daily", 7).unwrap();
            store.put_string("exam", "dele").unwrap();
        }

        let store = JsonFilePrefs::open(&path).unwrap();
        assert_eq!(store.get_i64("daily").unwrap(), Some(7));
        assert_eq!(store.get_string("exam").unwrap(), Some("dele".to_string()));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lingo.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFilePrefs::open(&path).unwrap();
        assert!(store.keys().unwrap().is_empty());

        store.put_i64("a", 1).unwrap();
        let reopened = JsonFilePrefs::open(&path).unwrap();
        assert_eq!(reopened.get_i64("a").unwrap(), Some(1));
    }

    #[test]
    fn test_clear_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lingo.json");
        let store = JsonFilePrefs::open(&path).unwrap();
        store.put_i64("a", 1).unwrap();
        store.clear().unwrap();

        let reopened = JsonFilePrefs::open(&path).unwrap();
        assert!(reopened.keys().unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lingo.json");
        let store = JsonFilePrefs::open(&path).unwrap();
        store.put_i64("a", 1).unwrap();

        // A directory in the temp file's place makes the write fail
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();
        assert!(store.put_i64("a", 2).is_err());
        assert!(store.remove("a").is_err());
        assert!(store.clear().is_err());

        assert_eq!(store.get_i64("a").unwrap(), Some(1));
        let reopened = JsonFilePrefs::open(&path).unwrap();
        assert_eq!(reopened.get_i64("a").unwrap(), Some(1));
    }

    #[test]
    fn test_removing_missing_key_skips_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lingo.json");
        let store = JsonFilePrefs::open(&path).unwrap();

        store.remove("nothing").unwrap();
        assert!(!path.exists());
    }
}
