use scrubgate_ledger::{IssueLedger, IssueRecord, KvStore, LedgerState, LEDGER_KEY};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Read-through snapshot of the ledger for presentation-layer reads.
///
/// Each context holds its own view; the cache is refreshed on demand and on
/// every store change notification for the ledger key, and is never treated
/// as authoritative. Writes always go through the background service, never
/// through a view.
pub struct LedgerView {
    ledger: IssueLedger,
    cache: RwLock<LedgerState>,
}

impl LedgerView {
    /// Build a view and spawn its invalidation task. The task exits when the
    /// view is dropped or the store's notification channel closes.
    pub fn new(store: Arc<dyn KvStore>) -> Arc<Self> {
        let view = Arc::new(Self {
            ledger: IssueLedger::new(store.clone()),
            cache: RwLock::new(LedgerState::default()),
        });
        view.refresh();

        let weak = Arc::downgrade(&view);
        let mut changes = store.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.key == LEDGER_KEY => {}
                    Ok(_) => continue,
                    // Missed notifications: refresh anyway, we cannot know
                    // whether the ledger key was among them.
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match weak.upgrade() {
                    Some(view) => view.refresh(),
                    None => break,
                }
            }
        });

        view
    }

    /// Re-read the whole ledger from the store.
    pub fn refresh(&self) {
        *self.cache.write().unwrap() = self.ledger.load();
    }

    /// Unresolved issues as of `now`, for display.
    pub fn active_issues(&self, now: i64) -> Vec<IssueRecord> {
        self.cache
            .read()
            .unwrap()
            .active_issues
            .iter()
            .filter(|issue| issue.is_active(now))
            .cloned()
            .collect()
    }

    /// Full history, insertion order; reverse-chronological display is the
    /// presentation layer's job.
    pub fn history(&self) -> Vec<IssueRecord> {
        self.cache.read().unwrap().history.clone()
    }
}
