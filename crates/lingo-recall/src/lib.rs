//! Spaced-repetition recall scheduling.
//!
//! Items move through a fixed, ordered list of interval "stops"
//! (`10m`, `1h`, `1D`, ...). Each successful recall advances an item one stop
//! and pushes its due time out by that stop's interval. The full item list is
//! kept as one JSON snapshot in a preference store under a caller-chosen key,
//! so switching exam or language swaps the active set.
//!
//! # Features
//!
//! - **Stops**: unit-suffix interval codes parsed into durations
//! - **State Machine**: explicit transition table for recall states
//! - **Scheduler**: add/recall/remove/focus operations with due queries
//! - **Save Scope**: background task that applies snapshot writes in order

pub mod error;
pub mod item;
pub mod persistence;
pub mod scheduler;
pub mod state;
pub mod stops;

// Re-exports
pub use error::{RecallError, RecallResult, StopCodeError, TransitionError};
pub use item::RecallItem;
pub use persistence::{Persistence, SaveScope};
pub use scheduler::{RecallScheduler, FOCUS_INTERVAL_MINUTES};
pub use state::RecallState;
pub use stops::{parse_stop_code, StopList, DEFAULT_STOP_CODES};
