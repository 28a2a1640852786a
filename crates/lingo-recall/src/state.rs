//! Recall states and the transitions between them.

use crate::error::TransitionError;
use serde::{Deserialize, Serialize};

/// Where an item is in the review cycle.
///
/// Serialized with the names stored by earlier snapshots. Anything
/// unrecognised decodes as [`RecallState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecallState {
    /// Tracked but never studied.
    NotStarted,
    /// Being studied for the first time.
    Memorising,
    /// Learner says they know it.
    Memorised,
    /// Last recall succeeded.
    #[serde(rename = "AnsweredOK")]
    AnsweredOk,
    /// Last recall failed.
    #[serde(rename = "AnsweredNotOK")]
    AnsweredNotOk,
    /// Scheduled, waiting for the next due time.
    Waiting,
    /// Due and shown to the learner.
    WaitingForAnswer,
    /// Retired from review.
    Done,
    #[serde(other)]
    Unknown,
}

impl Default for RecallState {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl RecallState {
    /// All states, in declaration order.
    pub const ALL: [RecallState; 9] = [
        Self::NotStarted,
        Self::Memorising,
        Self::Memorised,
        Self::AnsweredOk,
        Self::AnsweredNotOk,
        Self::Waiting,
        Self::WaitingForAnswer,
        Self::Done,
        Self::Unknown,
    ];

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Memorising => "Memorising",
            Self::Memorised => "Memorised",
            Self::AnsweredOk => "Answered OK",
            Self::AnsweredNotOk => "Answered not OK",
            Self::Waiting => "Waiting",
            Self::WaitingForAnswer => "Waiting for answer",
            Self::Done => "Done",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the item has a meaningful due time.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Waiting | Self::WaitingForAnswer)
    }

    /// The transition table.
    pub fn can_transition_to(&self, next: RecallState) -> bool {
        use RecallState::*;

        match self {
            NotStarted => matches!(
                next,
                Memorising | Memorised | Waiting | AnsweredOk | AnsweredNotOk | Done
            ),
            Memorising => matches!(next, Memorised | NotStarted | Waiting),
            Memorised => matches!(next, Waiting),
            Waiting => matches!(
                next,
                Waiting | WaitingForAnswer | AnsweredOk | AnsweredNotOk | Done
            ),
            WaitingForAnswer => matches!(next, AnsweredOk | AnsweredNotOk | Waiting),
            AnsweredOk => matches!(next, Waiting | Done),
            AnsweredNotOk => matches!(
                next,
                AnsweredNotOk | AnsweredOk | Waiting | WaitingForAnswer | Memorising | Memorised
            ),
            Done => matches!(next, NotStarted | Waiting),
            Unknown => matches!(next, NotStarted | Waiting),
        }
    }

    /// Move to `next` if the table allows it.
    pub fn transition(self, next: RecallState) -> Result<RecallState, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: self, to: next })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_names() {
        assert_eq!(serde_json::to_string(&RecallState::AnsweredOk).unwrap(), "\"AnsweredOK\"");
        assert_eq!(
            serde_json::from_str::<RecallState>("\"WaitingForAnswer\"").unwrap(),
            RecallState::WaitingForAnswer
        );
        assert_eq!(
            serde_json::from_str::<RecallState>("\"Archived\"").unwrap(),
            RecallState::Unknown
        );
    }

    #[test]
    fn test_review_cycle() {
        let state = RecallState::NotStarted
            .transition(RecallState::Memorising)
            .and_then(|s| s.transition(RecallState::Memorised))
            .and_then(|s| s.transition(RecallState::Waiting))
            .and_then(|s| s.transition(RecallState::WaitingForAnswer))
            .and_then(|s| s.transition(RecallState::AnsweredOk))
            .and_then(|s| s.transition(RecallState::Waiting))
            .unwrap();
        assert_eq!(state, RecallState::Waiting);
    }

    #[test]
    fn test_rejected_transitions() {
        let err = RecallState::Memorised
            .transition(RecallState::AnsweredOk)
            .unwrap_err();
        assert_eq!(err.from, RecallState::Memorised);
        assert_eq!(err.to, RecallState::AnsweredOk);

        assert!(!RecallState::Done.can_transition_to(RecallState::AnsweredNotOk));
        assert!(!RecallState::Memorising.can_transition_to(RecallState::AnsweredOk));
    }

    #[test]
    fn test_nothing_returns_to_unknown() {
        for state in RecallState::ALL {
            assert!(!state.can_transition_to(RecallState::Unknown));
        }
    }
}
