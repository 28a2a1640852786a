//! Recall items.

use crate::state::RecallState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vocabulary entry under spaced-repetition tracking.
///
/// `key` is the logical identity; `text`, `additional_text` and `image_id`
/// are display payload the scheduler never looks at. Timestamps are stored
/// as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallItem {
    pub id: Uuid,
    pub key: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub additional_text: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_date: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub learnt_time: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub prev_event_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub next_event_time: DateTime<Utc>,
    /// 1-based index into the stop list.
    pub current_stop_number: usize,
    #[serde(default)]
    pub recall_state: RecallState,
}

impl RecallItem {
    /// Create an item at stop 1, due immediately.
    pub fn new(
        key: impl Into<String>,
        text: impl Into<String>,
        image_id: impl Into<String>,
        additional_text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            text: text.into(),
            additional_text: additional_text.into(),
            image_id: image_id.into(),
            created_date: now,
            learnt_time: None,
            prev_event_time: now,
            next_event_time: now,
            current_stop_number: 1,
            recall_state: RecallState::NotStarted,
        }
    }

    /// Scheduled and past its due time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.recall_state.is_scheduled() && self.next_event_time <= now
    }
}
