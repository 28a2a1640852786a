//! Snapshot persistence.

use lingo_prefs::PrefsStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

/// How the scheduler writes its snapshot after a mutation.
#[derive(Clone, Default)]
pub enum Persistence {
    /// Write synchronously on the calling thread.
    #[default]
    Inline,
    /// Hand the snapshot to a long-lived save task.
    Background(SaveScope),
}

struct SaveRequest {
    store: Arc<dyn PrefsStore>,
    key: String,
    snapshot: Value,
}

enum Command {
    Save(SaveRequest),
    Flush(oneshot::Sender<()>),
}

/// Application-lifetime task that applies snapshot writes in order.
///
/// Saves are queued and outlive whatever triggered them. Two saves for the
/// same key land in submission order, so the last one wins. Failed writes
/// are logged and dropped. Cloning shares the same task.
#[derive(Clone)]
pub struct SaveScope {
    tx: mpsc::UnboundedSender<Command>,
}

impl SaveScope {
    /// Spawn the save task on the current tokio runtime.
    ///
    /// Panics if called outside a runtime; use [`SaveScope::spawn_on`] there.
    pub fn spawn() -> Self {
        Self::spawn_on(&Handle::current())
    }

    /// Spawn the save task on `handle`.
    pub fn spawn_on(handle: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        handle.spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Save(request) => {
                        let key = request.key.clone();
                        let result = tokio::task::spawn_blocking(move || {
                            request.store.put(&request.key, request.snapshot)
                        })
                        .await;

                        match result {
                            Ok(Ok(())) => log::debug!("Saved snapshot {}", key),
                            Ok(Err(e)) => log::warn!("Failed to save snapshot {}: {}", key, e),
                            Err(e) => log::warn!("Save task for {} did not complete: {}", key, e),
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx }
    }

    /// Queue `snapshot` to be written under `key`.
    pub fn save(&self, store: Arc<dyn PrefsStore>, key: impl Into<String>, snapshot: Value) {
        let key = key.into();
        let request = SaveRequest {
            store,
            key: key.clone(),
            snapshot,
        };
        if self.tx.send(Command::Save(request)).is_err() {
            log::warn!("Save scope has shut down; dropping snapshot {}", key);
        }
    }

    /// Wait until every save queued before this call has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_prefs::MemoryPrefs;

    #[tokio::test]
    async fn test_last_write_wins() {
        let store: Arc<dyn PrefsStore> = Arc::new(MemoryPrefs::new());
        let scope = SaveScope::spawn();

        for n in 0..20 {
            scope.save(store.clone(), "items", Value::from(n));
        }
        scope.flush().await;

        assert_eq!(store.get("items").unwrap(), Some(Value::from(19)));
    }

    #[tokio::test]
    async fn test_clones_share_the_queue() {
        let store: Arc<dyn PrefsStore> = Arc::new(MemoryPrefs::new());
        let scope = SaveScope::spawn();
        let other = scope.clone();

        scope.save(store.clone(), "a", Value::from(1));
        other.save(store.clone(), "a", Value::from(2));
        scope.flush().await;

        assert_eq!(store.get("a").unwrap(), Some(Value::from(2)));
    }
}
