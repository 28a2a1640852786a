//! Recall error types.

use crate::state::RecallState;
use thiserror::Error;

/// A stop code or stop list that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopCodeError {
    /// Blank code.
    #[error("Empty stop code")]
    EmptyCode,

    /// Amount is missing, not a number, or not positive.
    #[error("Invalid amount in stop code: {0}")]
    InvalidAmount(String),

    /// Unit suffix is not one of m, h, D, W, M.
    #[error("Unknown unit '{unit}' in stop code: {code}")]
    UnknownUnit { code: String, unit: char },

    /// Duration does not fit.
    #[error("Stop code out of range: {0}")]
    OutOfRange(String),

    /// A stop list needs at least one code.
    #[error("Stop list is empty")]
    EmptyList,
}

/// A state change the transition table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid recall transition: {} -> {}", .from.name(), .to.name())]
pub struct TransitionError {
    pub from: RecallState,
    pub to: RecallState,
}

/// Errors returned by scheduler operations.
#[derive(Debug, Error)]
pub enum RecallError {
    /// Rejected state change. The item is left untouched.
    #[error("Cannot update {key}: {source}")]
    InvalidTransition {
        key: String,
        #[source]
        source: TransitionError,
    },

    /// Stop configuration error.
    #[error("Stop code error: {0}")]
    StopCode(#[from] StopCodeError),
}

/// Result type for recall operations.
pub type RecallResult<T> = Result<T, RecallError>;
