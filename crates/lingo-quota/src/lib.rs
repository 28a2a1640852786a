//! Metered-action quotas.
//!
//! A [`QuotaTracker`] decides whether an expensive action (an AI paragraph
//! request, a TTS call) may run now, given hourly and daily ceilings, and
//! how long the caller has to wait when it may not. [`UsageCounter`] keeps
//! per-day tallies of the same actions for later upload.

pub mod limits;
pub mod tracker;
pub mod usage;

// Re-exports
pub use limits::QuotaLimits;
pub use tracker::{FailReason, QuotaDecision, QuotaState, QuotaTracker, QuotaUsage};
pub use usage::{UsageBucket, UsageCounter, UsageSink};
