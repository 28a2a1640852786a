//! Preferences stored in a SQLite table.

use crate::error::{PrefsError, PrefsResult};
use crate::store::PrefsStore;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed preference store. Values are stored as JSON text.
pub struct SqlitePrefs {
    conn: Mutex<Connection>,
}

impl SqlitePrefs {
    pub fn open(path: &Path) -> PrefsResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.init()?;
        Ok(store)
    }

    pub fn in_memory() -> PrefsResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> PrefsResult<()> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prefs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> PrefsResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PrefsError::Poisoned)
    }
}

impl PrefsStore for SqlitePrefs {
    fn get(&self, key: &str) -> PrefsResult<Option<Value>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM prefs WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: Value) -> PrefsResult<()> {
        let text = serde_json::to_string(&value)?;
        self.conn()?.execute(
            "INSERT INTO prefs (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, text, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> PrefsResult<()> {
        self.conn()?.execute("DELETE FROM prefs WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> PrefsResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM prefs ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SqlResult<Vec<String>>>()?;
        Ok(keys)
    }

    fn clear(&self) -> PrefsResult<()> {
        self.conn()?.execute("DELETE FROM prefs", [])?;
        Ok(())
    }
}
