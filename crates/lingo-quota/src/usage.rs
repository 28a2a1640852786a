//! Per-day usage counters.
//!
//! Counters are bucketed by local date in the preference store. Closed days
//! (anything before today) are handed to a [`UsageSink`] on flush and removed
//! once the sink accepts them; today's bucket keeps accumulating.

use chrono::NaiveDate;
use lingo_prefs::{Clock, PrefsStore, PrefsStoreExt};
use std::collections::BTreeMap;
use std::sync::Arc;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// One day's worth of counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageBucket {
    pub day: NaiveDate,
    pub counts: BTreeMap<String, u64>,
}

impl UsageBucket {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Destination for closed usage buckets.
pub trait UsageSink {
    fn push(&mut self, bucket: &UsageBucket) -> anyhow::Result<()>;
}

impl UsageSink for Vec<UsageBucket> {
    fn push(&mut self, bucket: &UsageBucket) -> anyhow::Result<()> {
        Vec::push(self, bucket.clone());
        Ok(())
    }
}

/// Write-through daily counters.
pub struct UsageCounter {
    store: Arc<dyn PrefsStore>,
    clock: Arc<dyn Clock>,
    namespace: String,
}

impl UsageCounter {
    pub fn new(
        store: Arc<dyn PrefsStore>,
        clock: Arc<dyn Clock>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            namespace: namespace.into(),
        }
    }

    /// Add one to `name` in today's bucket.
    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    /// Add `amount` to `name` in today's bucket.
    pub fn add(&self, name: &str, amount: u64) {
        let day = self.clock.now().date_naive();
        let key = self.bucket_key(day);
        let mut counts = self.read_bucket(&key);
        *counts.entry(name.to_string()).or_insert(0) += amount;

        if let Err(e) = self.store.put_json(&key, &counts) {
            log::warn!("{}: failed to update usage bucket {}: {}", self.namespace, key, e);
        }
    }

    /// Counters for today.
    pub fn today(&self) -> BTreeMap<String, u64> {
        let day = self.clock.now().date_naive();
        self.read_bucket(&self.bucket_key(day))
    }

    /// Closed buckets waiting to be flushed, oldest first.
    pub fn pending(&self) -> Vec<UsageBucket> {
        let today = self.clock.now().date_naive();
        let prefix = self.prefix();

        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("{}: failed to list usage buckets: {}", self.namespace, e);
                return Vec::new();
            }
        };

        let mut buckets: Vec<UsageBucket> = keys
            .iter()
            .filter_map(|key| {
                let day = NaiveDate::parse_from_str(key.strip_prefix(&prefix)?, DAY_FORMAT).ok()?;
                (day < today).then(|| UsageBucket {
                    day,
                    counts: self.read_bucket(key),
                })
            })
            .collect();
        buckets.sort_by_key(|b| b.day);
        buckets
    }

    /// Hand closed buckets to `sink`, oldest first.
    ///
    /// Stops at the first bucket the sink rejects; that bucket and later ones
    /// stay stored for the next attempt. Returns how many were flushed.
    pub fn flush(&self, sink: &mut dyn UsageSink) -> usize {
        let mut flushed = 0;
        for bucket in self.pending() {
            if let Err(e) = sink.push(&bucket) {
                log::warn!("{}: usage flush stopped at {}: {}", self.namespace, bucket.day, e);
                break;
            }
            if let Err(e) = self.store.remove(&self.bucket_key(bucket.day)) {
                log::warn!(
                    "{}: flushed bucket {} could not be removed: {}",
                    self.namespace,
                    bucket.day,
                    e
                );
            }
            flushed += 1;
        }
        flushed
    }

    fn prefix(&self) -> String {
        format!("{}.day.", self.namespace)
    }

    fn bucket_key(&self, day: NaiveDate) -> String {
        format!("{}{}", self.prefix(), day.format(DAY_FORMAT))
    }

    fn read_bucket(&self, key: &str) -> BTreeMap<String, u64> {
        match self.store.get_json(key) {
            Ok(counts) => counts.unwrap_or_default(),
            Err(e) => {
                log::warn!("{}: discarding unreadable usage bucket {}: {}", self.namespace, key, e);
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};
    use lingo_prefs::{ManualClock, MemoryPrefs};

    struct RejectingSink;

    impl UsageSink for RejectingSink {
        fn push(&mut self, _bucket: &UsageBucket) -> anyhow::Result<()> {
            anyhow::bail!("offline")
        }
    }

    fn setup() -> (UsageCounter, Arc<ManualClock>) {
        let start = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let counter = UsageCounter::new(Arc::new(MemoryPrefs::new()), clock.clone(), "tts_stats");
        (counter, clock)
    }

    #[test]
    fn test_counts_accumulate_per_day() {
        let (counter, _) = setup();
        counter.increment("es-ES");
        counter.increment("es-ES");
        counter.add("characters", 120);

        let today = counter.today();
        assert_eq!(today.get("es-ES"), Some(&2));
        assert_eq!(today.get("characters"), Some(&120));
        // Today is still open
        assert!(counter.pending().is_empty());
    }

    #[test]
    fn test_flush_closed_days_oldest_first() {
        let (counter, clock) = setup();
        counter.increment("a");
        clock.advance(Duration::days(1));
        counter.add("a", 3);
        clock.advance(Duration::days(1));
        counter.increment("b");

        let mut sink: Vec<UsageBucket> = Vec::new();
        assert_eq!(counter.flush(&mut sink), 2);
        assert_eq!(sink[0].day, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(sink[1].total(), 3);

        assert!(counter.pending().is_empty());
        assert_eq!(counter.today().get("b"), Some(&1));
    }

    #[test]
    fn test_rejected_flush_keeps_buckets() {
        let (counter, clock) = setup();
        counter.increment("a");
        clock.advance(Duration::days(1));

        assert_eq!(counter.flush(&mut RejectingSink), 0);
        assert_eq!(counter.pending().len(), 1);
    }
}
