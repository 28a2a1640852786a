//! In-memory preference store.

use crate::error::{PrefsError, PrefsResult};
use crate::store::PrefsStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Preferences held only in process memory.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryPrefs {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefsStore for MemoryPrefs {
    fn get(&self, key: &str) -> PrefsResult<Option<Value>> {
        let values = self.values.read().map_err(|_| PrefsError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> PrefsResult<()> {
        let mut values = self.values.write().map_err(|_| PrefsError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> PrefsResult<()> {
        let mut values = self.values.write().map_err(|_| PrefsError::Poisoned)?;
        values.remove(key);
        Ok(())
    }

    fn keys(&self) -> PrefsResult<Vec<String>> {
        let values = self.values.read().map_err(|_| PrefsError::Poisoned)?;
        Ok(values.keys().cloned().collect())
    }

    fn clear(&self) -> PrefsResult<()> {
        let mut values = self.values.write().map_err(|_| PrefsError::Poisoned)?;
        values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryPrefs::new();
        store.put("k", Value::from(1)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Value::from(1)));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        // Removing twice is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_keys_sorted() {
        let store = MemoryPrefs::new();
        store.put("b", Value::Null).unwrap();
        store.put("a", Value::Null).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }
}
