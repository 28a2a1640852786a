//! Local key-value preferences for the lingo components.
//!
//! This crate provides the small amount of device-local infrastructure the
//! quota tracker and the recall scheduler sit on top of.
//!
//! # Features
//!
//! - **Preference Store**: `PrefsStore` trait over JSON values, with typed helpers
//! - **Backends**: in-memory, single JSON file, and SQLite table
//! - **Clock**: injectable wall clock with a manual variant for tests

pub mod clock;
pub mod error;
pub mod json_file;
pub mod memory;
pub mod sqlite;
pub mod store;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PrefsError, PrefsResult};
pub use json_file::JsonFilePrefs;
pub use memory::MemoryPrefs;
pub use sqlite::SqlitePrefs;
pub use store::{PrefsStore, PrefsStoreExt};
