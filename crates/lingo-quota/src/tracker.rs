//! Hourly/daily quota tracking.

use crate::limits::QuotaLimits;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use lingo_prefs::{Clock, PrefsStore, PrefsStoreExt};
use std::sync::Arc;

/// Length of the hourly window in seconds.
pub const HOUR_SECS: i64 = 3600;

const HOURLY_COUNT: &str = "hourly_count";
const DAILY_COUNT: &str = "daily_count";
const PERIOD_START: &str = "period_start";
const DAY_MARKER: &str = "day_marker";

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Which ceiling rejected a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    Daily,
    Hourly,
}

impl FailReason {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Hourly => "hourly",
        }
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Whether the call may go ahead.
    pub allowed: bool,
    /// Ceiling that was hit, if any.
    pub fail_reason: Option<FailReason>,
    /// Seconds until the ceiling lifts, when known.
    pub wait_seconds: Option<u64>,
}

impl QuotaDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            fail_reason: None,
            wait_seconds: None,
        }
    }

    fn deny(reason: FailReason, wait_seconds: Option<u64>) -> Self {
        Self {
            allowed: false,
            fail_reason: Some(reason),
            wait_seconds,
        }
    }

    /// Wait time as a std duration.
    pub fn wait(&self) -> Option<std::time::Duration> {
        self.wait_seconds.map(std::time::Duration::from_secs)
    }
}

/// Persisted counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaState {
    pub hourly_count: u32,
    pub daily_count: u32,
    /// Start of the open hourly window.
    pub period_start: Option<DateTime<Utc>>,
    /// Local date the counters belong to.
    pub day_marker: Option<NaiveDate>,
}

impl QuotaState {
    /// Apply day and hour rollovers as of `now`. Returns true if anything changed.
    fn roll_over(&mut self, now: DateTime<Local>) -> bool {
        let today = now.date_naive();
        if self.day_marker != Some(today) {
            self.hourly_count = 0;
            self.daily_count = 0;
            self.period_start = None;
            self.day_marker = Some(today);
            return true;
        }

        if let Some(start) = self.period_start {
            if now.with_timezone(&Utc).signed_duration_since(start) > hour() {
                self.hourly_count = 0;
                self.period_start = None;
                return true;
            }
        }

        false
    }
}

/// Counts and headroom for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaUsage {
    pub hourly_count: u32,
    pub daily_count: u32,
    pub hourly_remaining: u32,
    pub daily_remaining: u32,
}

/// Decides whether a metered action may run.
///
/// State lives in the preference store under `<namespace>.*` keys, so several
/// trackers (one per metered action) can share a store. Storage failures are
/// logged and read back as empty state; no method returns an error.
pub struct QuotaTracker {
    store: Arc<dyn PrefsStore>,
    clock: Arc<dyn Clock>,
    namespace: String,
    limits: QuotaLimits,
}

impl QuotaTracker {
    pub fn new(
        store: Arc<dyn PrefsStore>,
        clock: Arc<dyn Clock>,
        namespace: impl Into<String>,
        limits: QuotaLimits,
    ) -> Self {
        Self {
            store,
            clock,
            namespace: namespace.into(),
            limits,
        }
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Turn the global switch on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.limits.enabled = enabled;
    }

    /// Check whether a call may be made now.
    ///
    /// Rolls counters over first. The daily ceiling is checked before the
    /// hourly one, so an exhausted day is always what gets reported.
    pub fn can_make_call(&self) -> QuotaDecision {
        if !self.limits.enabled {
            return QuotaDecision::allow();
        }

        let now = self.clock.now();
        let mut state = self.load_state();
        if state.roll_over(now) {
            self.store_state(&state);
        }

        if state.daily_count >= self.limits.daily_limit {
            log::debug!("{}: daily quota exhausted ({})", self.namespace, state.daily_count);
            return QuotaDecision::deny(FailReason::Daily, seconds_until_midnight(now));
        }

        if state.hourly_count >= self.limits.hourly_limit {
            log::debug!("{}: hourly quota exhausted ({})", self.namespace, state.hourly_count);
            let wait = state.period_start.map(|start| hourly_wait(start, now));
            return QuotaDecision::deny(FailReason::Hourly, wait);
        }

        QuotaDecision::allow()
    }

    /// Count one call against both windows.
    pub fn record_call(&self) {
        let now = self.clock.now();
        let mut state = self.load_state();
        state.roll_over(now);

        state.hourly_count = state.hourly_count.saturating_add(1);
        state.daily_count = state.daily_count.saturating_add(1);
        if state.period_start.is_none() {
            state.period_start = Some(now.with_timezone(&Utc));
        }

        log::debug!(
            "{}: recorded call (hourly {}, daily {})",
            self.namespace,
            state.hourly_count,
            state.daily_count
        );
        self.store_state(&state);
    }

    /// Forget all counters and the open window.
    pub fn reset_rate_limits(&self) {
        for field in [HOURLY_COUNT, DAILY_COUNT, PERIOD_START, DAY_MARKER] {
            if let Err(e) = self.store.remove(&self.key(field)) {
                log::warn!("{}: failed to clear {}: {}", self.namespace, field, e);
            }
        }
    }

    /// Effective state as of now. Does not write rollovers back.
    pub fn state(&self) -> QuotaState {
        let mut state = self.load_state();
        state.roll_over(self.clock.now());
        state
    }

    pub fn usage(&self) -> QuotaUsage {
        let state = self.state();
        QuotaUsage {
            hourly_count: state.hourly_count,
            daily_count: state.daily_count,
            hourly_remaining: self.limits.hourly_limit.saturating_sub(state.hourly_count),
            daily_remaining: self.limits.daily_limit.saturating_sub(state.daily_count),
        }
    }

    fn key(&self, field: &str) -> String {
        format!("{}.{}", self.namespace, field)
    }

    fn load_state(&self) -> QuotaState {
        QuotaState {
            hourly_count: self.read_count(HOURLY_COUNT),
            daily_count: self.read_count(DAILY_COUNT),
            period_start: self.read_string(PERIOD_START).and_then(|s| {
                match DateTime::parse_from_rfc3339(&s) {
                    Ok(dt) => Some(dt.with_timezone(&Utc)),
                    Err(e) => {
                        log::warn!(
                            "{}: ignoring malformed period start {:?}: {}",
                            self.namespace,
                            s,
                            e
                        );
                        None
                    }
                }
            }),
            day_marker: self.read_string(DAY_MARKER).and_then(|s| {
                match NaiveDate::parse_from_str(&s, DAY_FORMAT) {
                    Ok(day) => Some(day),
                    Err(e) => {
                        log::warn!(
                            "{}: ignoring malformed day marker {:?}: {}",
                            self.namespace,
                            s,
                            e
                        );
                        None
                    }
                }
            }),
        }
    }

    fn read_count(&self, field: &str) -> u32 {
        match self.store.get_i64(&self.key(field)) {
            Ok(value) => value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
            Err(e) => {
                log::warn!("{}: failed to read {}: {}", self.namespace, field, e);
                0
            }
        }
    }

    fn read_string(&self, field: &str) -> Option<String> {
        match self.store.get_string(&self.key(field)) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: failed to read {}: {}", self.namespace, field, e);
                None
            }
        }
    }

    fn store_state(&self, state: &QuotaState) {
        let result = self
            .store
            .put_i64(&self.key(HOURLY_COUNT), i64::from(state.hourly_count))
            .and_then(|_| self.store.put_i64(&self.key(DAILY_COUNT), i64::from(state.daily_count)))
            .and_then(|_| match state.period_start {
                Some(start) => self.store.put_string(&self.key(PERIOD_START), start.to_rfc3339()),
                None => self.store.remove(&self.key(PERIOD_START)),
            })
            .and_then(|_| match state.day_marker {
                Some(day) => self
                    .store
                    .put_string(&self.key(DAY_MARKER), day.format(DAY_FORMAT).to_string()),
                None => self.store.remove(&self.key(DAY_MARKER)),
            });

        if let Err(e) = result {
            log::warn!("{}: failed to persist quota state: {}", self.namespace, e);
        }
    }
}

fn hour() -> Duration {
    Duration::seconds(HOUR_SECS)
}

/// Whole seconds left in the window opened at `start`, rounded up.
///
/// Elapsed time is clamped into the window, so a clock that stepped
/// backwards never reports more than an hour.
fn hourly_wait(start: DateTime<Utc>, now: DateTime<Local>) -> u64 {
    let elapsed = now
        .with_timezone(&Utc)
        .signed_duration_since(start)
        .clamp(Duration::zero(), hour());
    let remaining = hour() - elapsed;
    let whole = remaining.num_seconds();
    let wait = if remaining > Duration::seconds(whole) { whole + 1 } else { whole };
    wait.max(0) as u64
}

/// Seconds from `now` to the next local midnight.
pub fn seconds_until_midnight(now: DateTime<Local>) -> Option<u64> {
    let tomorrow = now.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?;
    let midnight = Local.from_local_datetime(&tomorrow).earliest()?;
    Some(midnight.signed_duration_since(now).num_seconds().max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_prefs::{ManualClock, MemoryPrefs};

    fn setup(hourly: u32, daily: u32) -> (QuotaTracker, Arc<ManualClock>, Arc<MemoryPrefs>) {
        let start = Local.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MemoryPrefs::new());
        let tracker = QuotaTracker::new(
            store.clone(),
            clock.clone(),
            "ai",
            QuotaLimits::new(hourly, daily),
        );
        (tracker, clock, store)
    }

    #[test]
    fn test_fresh_tracker_allows() {
        let (tracker, _, _) = setup(2, 10);
        let decision = tracker.can_make_call();
        assert!(decision.allowed);
        assert_eq!(decision.fail_reason, None);
        assert_eq!(decision.wait_seconds, None);
    }

    #[test]
    fn test_record_opens_period() {
        let (tracker, clock, _) = setup(2, 10);
        tracker.record_call();

        let state = tracker.state();
        assert_eq!(state.hourly_count, 1);
        assert_eq!(state.daily_count, 1);
        assert_eq!(state.period_start, Some(clock.now().with_timezone(&Utc)));
    }

    #[test]
    fn test_hourly_wait_counts_down() {
        let (tracker, clock, _) = setup(1, 10);
        tracker.record_call();
        clock.advance(Duration::minutes(15));

        let decision = tracker.can_make_call();
        assert!(!decision.allowed);
        assert_eq!(decision.fail_reason, Some(FailReason::Hourly));
        assert_eq!(decision.wait_seconds, Some(45 * 60));
    }

    #[test]
    fn test_hourly_window_resets_past_a_fractional_hour() {
        let (tracker, clock, _) = setup(1, 10);
        tracker.record_call();
        clock.advance(Duration::milliseconds(3_600_500));

        let decision = tracker.can_make_call();
        assert!(decision.allowed);
        assert_eq!(tracker.state().hourly_count, 0);
    }

    #[test]
    fn test_hourly_wait_rounds_up() {
        let (tracker, clock, _) = setup(1, 10);
        tracker.record_call();
        clock.advance(Duration::milliseconds(3_599_500));

        let decision = tracker.can_make_call();
        assert_eq!(decision.fail_reason, Some(FailReason::Hourly));
        assert_eq!(decision.wait_seconds, Some(1));
    }

    #[test]
    fn test_hourly_wait_capped_when_clock_steps_back() {
        let (tracker, clock, _) = setup(1, 10);
        tracker.record_call();
        clock.advance(-Duration::minutes(30));

        let decision = tracker.can_make_call();
        assert_eq!(decision.fail_reason, Some(FailReason::Hourly));
        assert_eq!(decision.wait_seconds, Some(3600));
    }

    #[test]
    fn test_daily_takes_precedence() {
        let (tracker, _, _) = setup(2, 2);
        tracker.record_call();
        tracker.record_call();

        let decision = tracker.can_make_call();
        assert_eq!(decision.fail_reason, Some(FailReason::Daily));
        // 10:00 -> midnight
        assert_eq!(decision.wait_seconds, Some(14 * 3600));
    }

    #[test]
    fn test_counts_exceed_limit_once_recorded() {
        let (tracker, _, _) = setup(1, 10);
        tracker.record_call();
        tracker.record_call();
        tracker.record_call();
        assert_eq!(tracker.state().hourly_count, 3);
    }

    #[test]
    fn test_disabled_allows_without_side_effects() {
        let (mut tracker, clock, store) = setup(1, 1);
        tracker.record_call();
        tracker.set_enabled(false);

        clock.advance(Duration::days(1));
        let before = store.keys().unwrap();
        let decision = tracker.can_make_call();
        assert!(decision.allowed);

        // The stale day marker was not rolled over
        assert_eq!(store.keys().unwrap(), before);
        assert_eq!(store.get_i64("ai.daily_count").unwrap(), Some(1));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (tracker, _, store) = setup(1, 1);
        tracker.record_call();
        tracker.reset_rate_limits();

        assert!(store.keys().unwrap().is_empty());
        assert!(tracker.can_make_call().allowed);
    }

    #[test]
    fn test_malformed_period_start_is_ignored() {
        let (tracker, _, store) = setup(1, 10);
        tracker.record_call();
        store.put_string("ai.period_start", "yesterday-ish").unwrap();

        let decision = tracker.can_make_call();
        assert_eq!(decision.fail_reason, Some(FailReason::Hourly));
        assert_eq!(decision.wait_seconds, None);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let (tracker, clock, store) = setup(1, 10);
        let tts = QuotaTracker::new(store.clone(), clock.clone(), "tts", QuotaLimits::new(1, 10));
        tracker.record_call();

        assert!(!tracker.can_make_call().allowed);
        assert!(tts.can_make_call().allowed);
    }

    #[test]
    fn test_usage_remaining() {
        let (tracker, _, _) = setup(5, 10);
        tracker.record_call();
        tracker.record_call();

        let usage = tracker.usage();
        assert_eq!(usage.hourly_remaining, 3);
        assert_eq!(usage.daily_remaining, 8);
    }

    #[test]
    fn test_seconds_until_midnight() {
        let now = Local.with_ymd_and_hms(2024, 6, 15, 23, 59, 0).unwrap();
        assert_eq!(seconds_until_midnight(now), Some(60));
    }
}
