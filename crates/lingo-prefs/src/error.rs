//! Preference store error types.

use thiserror::Error;

/// Errors that can occur while reading or writing preferences.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored value has an unexpected shape.
    #[error("Type mismatch for key {key}: expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// A lock guarding the store was poisoned.
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for preference operations.
pub type PrefsResult<T> = Result<T, PrefsError>;
