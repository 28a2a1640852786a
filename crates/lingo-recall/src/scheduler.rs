//! The recall scheduler.

use crate::error::{RecallError, RecallResult, TransitionError};
use crate::item::RecallItem;
use crate::persistence::Persistence;
use crate::state::RecallState;
use crate::stops::StopList;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use lingo_prefs::{Clock, PrefsStore, PrefsStoreExt};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Interval used by [`RecallScheduler::focus_on_word`].
pub const FOCUS_INTERVAL_MINUTES: i64 = 10;

/// Tracks recall items through the stop list and persists them.
///
/// Every mutation writes the full item list as one JSON snapshot under the
/// active storage key. Operations on keys that are not tracked are no-ops
/// and report `false`. State changes the transition table rejects return
/// [`RecallError::InvalidTransition`] and leave the item as it was.
pub struct RecallScheduler {
    store: Arc<dyn PrefsStore>,
    storage_key: String,
    stops: StopList,
    clock: Arc<dyn Clock>,
    persistence: Persistence,
    items: Vec<RecallItem>,
}

impl RecallScheduler {
    /// Create an empty scheduler. Call [`RecallScheduler::load`] to read stored items.
    pub fn new(
        store: Arc<dyn PrefsStore>,
        storage_key: impl Into<String>,
        stops: StopList,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            storage_key: storage_key.into(),
            stops,
            clock,
            persistence: Persistence::Inline,
            items: Vec::new(),
        }
    }

    /// Set how snapshots are written.
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn stops(&self) -> &StopList {
        &self.stops
    }

    // Loading

    /// Replace the in-memory list with the snapshot under the active key.
    ///
    /// A missing or unreadable snapshot yields an empty list. Duplicate keys
    /// keep their first occurrence and stop numbers are clamped to the stop
    /// list. Returns the number of items loaded.
    pub fn load(&mut self) -> usize {
        let stored: Vec<RecallItem> = match self.store.get_json(&self.storage_key) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                log::warn!("Discarding unreadable recall items under {}: {}", self.storage_key, e);
                Vec::new()
            }
        };

        self.items.clear();
        for mut item in stored {
            if self.items.iter().any(|i| i.key == item.key) {
                log::warn!("Dropping duplicate recall item {}", item.key);
                continue;
            }
            item.current_stop_number = self.stops.clamp(item.current_stop_number);
            self.items.push(item);
        }

        log::debug!("Loaded {} recall items from {}", self.items.len(), self.storage_key);
        self.items.len()
    }

    /// Point the scheduler at another storage key and load it.
    ///
    /// Nothing is migrated between keys. With background persistence, flush
    /// the save scope first if the new key may have pending writes.
    pub fn switch_storage_key(&mut self, storage_key: impl Into<String>) -> usize {
        self.storage_key = storage_key.into();
        self.load()
    }

    // Mutations

    /// Start tracking `key` at stop 1. Returns false if it is already tracked.
    pub fn add(
        &mut self,
        key: &str,
        text: impl Into<String>,
        image_id: impl Into<String>,
        additional_text: impl Into<String>,
    ) -> bool {
        if self.contains(key) {
            return false;
        }

        let item = RecallItem::new(key, text, image_id, additional_text, self.now());
        log::debug!("Tracking recall item {}", key);
        self.items.push(item);
        self.save();
        true
    }

    /// Record a successful recall: advance one stop (holding at the last)
    /// and schedule the next review after that stop's interval.
    pub fn recalled_ok(&mut self, key: &str) -> RecallResult<bool> {
        self.update(key, |item, now, stops| {
            let state = item
                .recall_state
                .transition(RecallState::AnsweredOk)?
                .transition(RecallState::Waiting)?;

            item.current_stop_number = stops.clamp(item.current_stop_number + 1);
            item.recall_state = state;
            item.prev_event_time = now;
            item.next_event_time = now + stops.duration_for(item.current_stop_number);
            Ok(())
        })
    }

    /// Record a failed recall. Stop number and times are left alone.
    pub fn recalled_not_ok(&mut self, key: &str) -> RecallResult<bool> {
        self.update(key, |item, _, _| {
            item.recall_state = item.recall_state.transition(RecallState::AnsweredNotOk)?;
            Ok(())
        })
    }

    /// Mark `key` as learnt and schedule it at its current stop's interval.
    pub fn i_have_memorised_it(&mut self, key: &str) -> RecallResult<bool> {
        self.update(key, |item, now, stops| {
            let state = item
                .recall_state
                .transition(RecallState::Memorised)?
                .transition(RecallState::Waiting)?;

            item.recall_state = state;
            item.learnt_time = Some(now);
            item.prev_event_time = now;
            item.next_event_time = now + stops.duration_for(item.current_stop_number);
            Ok(())
        })
    }

    /// Begin studying `key`.
    pub fn start_memorising(&mut self, key: &str) -> RecallResult<bool> {
        self.set_state(key, RecallState::Memorising)
    }

    /// `key` is due and has been put in front of the learner.
    pub fn await_answer(&mut self, key: &str) -> RecallResult<bool> {
        self.set_state(key, RecallState::WaitingForAnswer)
    }

    /// Retire `key` from review.
    pub fn mark_done(&mut self, key: &str) -> RecallResult<bool> {
        self.set_state(key, RecallState::Done)
    }

    /// Track `word` if needed and schedule it ten minutes out, regardless of its stop.
    pub fn focus_on_word(&mut self, word: &str) -> RecallResult<()> {
        self.add(word, word, "", "");
        self.update(word, |item, now, _| {
            item.recall_state = item.recall_state.transition(RecallState::Waiting)?;
            item.prev_event_time = now;
            item.next_event_time = now + Duration::minutes(FOCUS_INTERVAL_MINUTES);
            Ok(())
        })?;
        Ok(())
    }

    /// Stop tracking `key`. Returns false if it was not tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.key != key);
        if self.items.len() == before {
            return false;
        }
        log::debug!("Removed recall item {}", key);
        self.save();
        true
    }

    /// Stop tracking everything under the active key.
    pub fn remove_all(&mut self) {
        self.items.clear();
        self.save();
    }

    // Queries

    pub fn get(&self, key: &str) -> Option<&RecallItem> {
        self.items.iter().find(|i| i.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All items in insertion order.
    pub fn items(&self) -> &[RecallItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Scheduled items whose due time has passed, earliest first.
    pub fn due_items(&self) -> Vec<&RecallItem> {
        let now = self.now();
        let mut due: Vec<&RecallItem> = self.items.iter().filter(|i| i.is_due(now)).collect();
        due.sort_by_key(|i| i.next_event_time);
        due
    }

    /// The scheduled item that comes due soonest, due or not.
    pub fn next_due(&self) -> Option<&RecallItem> {
        self.items
            .iter()
            .filter(|i| i.recall_state.is_scheduled())
            .min_by_key(|i| i.next_event_time)
    }

    /// Item count per state.
    pub fn state_counts(&self) -> BTreeMap<RecallState, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.recall_state).or_insert(0) += 1;
        }
        counts
    }

    // Internals

    fn now(&self) -> DateTime<Utc> {
        // Snapshots keep milliseconds; match that in memory
        self.clock.now().with_timezone(&Utc).trunc_subsecs(3)
    }

    fn set_state(&mut self, key: &str, next: RecallState) -> RecallResult<bool> {
        self.update(key, |item, _, _| {
            item.recall_state = item.recall_state.transition(next)?;
            Ok(())
        })
    }

    /// Apply `change` to a copy of the item and commit it only on success.
    fn update<F>(&mut self, key: &str, change: F) -> RecallResult<bool>
    where
        F: FnOnce(&mut RecallItem, DateTime<Utc>, &StopList) -> Result<(), TransitionError>,
    {
        let now = self.now();
        let Some(index) = self.items.iter().position(|i| i.key == key) else {
            return Ok(false);
        };

        let mut updated = self.items[index].clone();
        change(&mut updated, now, &self.stops).map_err(|source| RecallError::InvalidTransition {
            key: key.to_string(),
            source,
        })?;

        log::debug!(
            "Recall item {}: {} at stop {}",
            key,
            updated.recall_state.name(),
            updated.current_stop_number
        );
        self.items[index] = updated;
        self.save();
        Ok(true)
    }

    fn save(&self) {
        let snapshot = match serde_json::to_value(&self.items) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Failed to encode recall items for {}: {}", self.storage_key, e);
                return;
            }
        };

        match &self.persistence {
            Persistence::Inline => {
                if let Err(e) = self.store.put(&self.storage_key, snapshot) {
                    log::warn!("Failed to save recall items under {}: {}", self.storage_key, e);
                }
            }
            Persistence::Background(scope) => {
                scope.save(self.store.clone(), self.storage_key.clone(), snapshot);
            }
        }
    }
}
