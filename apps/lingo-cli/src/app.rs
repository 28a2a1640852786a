//! Application wiring: one preference store shared by every component.

use crate::config::{Config, StorageBackend};
use lingo_prefs::{Clock, JsonFilePrefs, PrefsStore, SqlitePrefs, SystemClock};
use lingo_quota::{QuotaLimits, QuotaTracker, UsageBucket, UsageCounter, UsageSink};
use lingo_recall::{Persistence, RecallScheduler, SaveScope};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A metered action with its own quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    Ai,
    Tts,
}

impl Action {
    /// Namespace for this action's quota keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Tts => "tts",
        }
    }
}

pub struct App {
    pub config: Config,
    store: Arc<dyn PrefsStore>,
    clock: Arc<dyn Clock>,
    scope: SaveScope,
}

impl App {
    /// Open the configured store. Must be called inside a tokio runtime.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let path = config
            .prefs_path()
            .unwrap_or_else(|| PathBuf::from(config.storage.backend.file_name()));
        let store = open_store(config.storage.backend, &path)?;
        Ok(Self::with_store(config, store, Arc::new(SystemClock)))
    }

    pub fn with_store(config: Config, store: Arc<dyn PrefsStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
            scope: SaveScope::spawn(),
        }
    }

    pub fn quota(&self, action: Action) -> QuotaTracker {
        let limits: QuotaLimits = match action {
            Action::Ai => self.config.quota.ai,
            Action::Tts => self.config.quota.tts,
        };
        QuotaTracker::new(
            self.store.clone(),
            self.clock.clone(),
            format!("quota.{}", action.name()),
            limits,
        )
    }

    pub fn usage(&self) -> UsageCounter {
        UsageCounter::new(self.store.clone(), self.clock.clone(), "usage")
    }

    /// Scheduler for the configured exam and language, already loaded.
    pub fn scheduler(&self) -> RecallScheduler {
        let mut scheduler = RecallScheduler::new(
            self.store.clone(),
            self.config.recall.storage_key(),
            self.config.recall.stop_list(),
            self.clock.clone(),
        )
        .with_persistence(Persistence::Background(self.scope.clone()));
        scheduler.load();
        scheduler
    }

    /// Wait for queued snapshot writes.
    pub async fn flush(&self) {
        self.scope.flush().await;
    }
}

fn open_store(backend: StorageBackend, path: &Path) -> anyhow::Result<Arc<dyn PrefsStore>> {
    log::debug!("Opening {:?} preferences at {}", backend, path.display());
    let store: Arc<dyn PrefsStore> = match backend {
        StorageBackend::Json => Arc::new(JsonFilePrefs::open(path)?),
        StorageBackend::Sqlite => Arc::new(SqlitePrefs::open(path)?),
    };
    Ok(store)
}

/// Appends flushed usage buckets to a JSON Lines file.
pub struct JsonLinesSink {
    file: std::fs::File,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl UsageSink for JsonLinesSink {
    fn push(&mut self, bucket: &UsageBucket) -> anyhow::Result<()> {
        let line = serde_json::json!({
            "day": bucket.day.format("%Y-%m-%d").to_string(),
            "counts": bucket.counts,
        });
        writeln!(self.file, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};
    use lingo_prefs::{ManualClock, MemoryPrefs};

    fn app() -> (App, Arc<ManualClock>) {
        let start = Local.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let app = App::with_store(Config::default(), Arc::new(MemoryPrefs::new()), clock.clone());
        (app, clock)
    }

    #[tokio::test]
    async fn test_actions_have_separate_quotas() {
        let (mut app, _) = app();
        app.config.quota.ai = QuotaLimits::new(1, 10);
        app.quota(Action::Ai).record_call();

        assert!(!app.quota(Action::Ai).can_make_call().allowed);
        assert!(app.quota(Action::Tts).can_make_call().allowed);
    }

    #[tokio::test]
    async fn test_scheduler_reloads_after_flush() {
        let (app, _) = app();
        let mut scheduler = app.scheduler();
        scheduler.add("gato", "cat", "", "");
        app.flush().await;

        assert!(app.scheduler().contains("gato"));
    }

    #[tokio::test]
    async fn test_usage_flush_to_file() {
        let (app, clock) = app();
        app.usage().increment("ai");
        clock.advance(Duration::days(1));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("usage.jsonl");
        let mut sink = JsonLinesSink::create(&path).unwrap();
        assert_eq!(app.usage().flush(&mut sink), 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"2024-06-15\""));
        assert!(written.contains("\"ai\":1"));
    }
}
