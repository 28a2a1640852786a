//! The preference store abstraction.

use crate::error::{PrefsError, PrefsResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A flat key-value store for small pieces of local state.
///
/// Implementations synchronise internally so a single store can be shared
/// behind an `Arc` between components and background save tasks.
pub trait PrefsStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> PrefsResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: Value) -> PrefsResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> PrefsResult<()>;

    /// List all stored keys in sorted order.
    fn keys(&self) -> PrefsResult<Vec<String>>;

    /// Remove every key.
    fn clear(&self) -> PrefsResult<()> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }

    /// Check whether `key` is present.
    fn contains(&self, key: &str) -> PrefsResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Typed accessors on top of [`PrefsStore`].
pub trait PrefsStoreExt: PrefsStore {
    /// Read an integer.
    fn get_i64(&self, key: &str) -> PrefsResult<Option<i64>> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| mismatch(key, "integer")),
            Some(_) => Err(mismatch(key, "integer")),
        }
    }

    /// Write an integer.
    fn put_i64(&self, key: &str, value: i64) -> PrefsResult<()> {
        self.put(key, Value::from(value))
    }

    /// Read a string.
    fn get_string(&self, key: &str) -> PrefsResult<Option<String>> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(mismatch(key, "string")),
        }
    }

    /// Write a string.
    fn put_string(&self, key: &str, value: impl Into<String>) -> PrefsResult<()> {
        self.put(key, Value::String(value.into()))
    }

    /// Read a boolean.
    fn get_bool(&self, key: &str) -> PrefsResult<Option<bool>> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(_) => Err(mismatch(key, "boolean")),
        }
    }

    /// Write a boolean.
    fn put_bool(&self, key: &str, value: bool) -> PrefsResult<()> {
        self.put(key, Value::Bool(value))
    }

    /// Decode a serde value stored under `key`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> PrefsResult<Option<T>> {
        match self.get(key)? {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Encode and store a serde value under `key`.
    fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PrefsResult<()> {
        self.put(key, serde_json::to_value(value)?)
    }
}

impl<S: PrefsStore + ?Sized> PrefsStoreExt for S {}

fn mismatch(key: &str, expected: &'static str) -> PrefsError {
    PrefsError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}
