//! # ScrubGate Ledger
//!
//! Durable record of every email detection. Two projections over one stored
//! object: a mutable active working set and an append-only history. The whole
//! ledger is serialized as a single JSON value under a fixed key in the
//! key-value store; mutations are whole-object read-modify-write and the last
//! writer wins. Detections are advisory, so that race is accepted rather than
//! locked away.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub mod schema;
pub mod store;

pub use store::{KvStore, MemoryStore, SqliteStore, StoreChange, StoreError};

/// The fixed store key the serialized ledger lives under.
pub const LEDGER_KEY: &str = "scrubgate_issues";

/// How long a dismissed address stays suppressed: 24 hours, in millis.
pub const SUPPRESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

// ════════════════════════════════════════════════════════════════════
// Data types
// ════════════════════════════════════════════════════════════════════

/// A single detected-email event with lifecycle metadata.
///
/// Lifecycle is derived, never stored: a record is ACTIVE while
/// `suppressed_until` is unset or in the past, SUPPRESSED while it is in the
/// future. Records are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Stable unique id; the same value in both projections.
    pub id: String,
    /// The detected address, originally cased.
    pub email: String,
    /// Detection time, epoch millis.
    pub detected_at: i64,
    /// When set and in the future, this address does not re-alert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed_until: Option<i64>,
    /// Truncated source text. Advisory only, never used for matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl IssueRecord {
    fn new(email: &str, context: Option<&str>, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            detected_at: now,
            suppressed_until: None,
            context: context.map(|c| c.to_string()),
        }
    }

    /// ACTIVE at `now`: no suppression set, or the window already passed.
    pub fn is_active(&self, now: i64) -> bool {
        match self.suppressed_until {
            None => true,
            Some(until) => until < now,
        }
    }
}

/// The persisted shape: both projections of the same record set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerState {
    pub active_issues: Vec<IssueRecord>,
    pub history: Vec<IssueRecord>,
}

// ════════════════════════════════════════════════════════════════════
// IssueLedger
// ════════════════════════════════════════════════════════════════════

/// Read-modify-write facade over the stored ledger object.
///
/// Every operation tolerates an empty or unreadable stored value by treating
/// it as an empty ledger — never as an error. Write failures are logged and
/// dropped: detections are best-effort by design.
#[derive(Clone)]
pub struct IssueLedger {
    store: Arc<dyn KvStore>,
}

impl IssueLedger {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Load the whole ledger. Absent or corrupt payloads read as empty.
    pub fn load(&self) -> LedgerState {
        match self.store.get(LEDGER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("Stored ledger unreadable, treating as empty: {}", e);
                    LedgerState::default()
                }
            },
            Ok(None) => LedgerState::default(),
            Err(e) => {
                tracing::error!("Failed to load ledger: {}", e);
                LedgerState::default()
            }
        }
    }

    fn save(&self, state: &LedgerState) {
        match serde_json::to_string(state) {
            Ok(raw) => {
                if let Err(e) = self.store.set(LEDGER_KEY, &raw) {
                    tracing::error!("Failed to persist ledger: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize ledger: {}", e),
        }
    }

    /// Record a fresh detection in both projections.
    ///
    /// If an ACTIVE, unsuppressed record for this exact address already
    /// exists, the call is a full no-op — history included.
    pub fn add_issue(&self, email: &str, context: Option<&str>) {
        let mut state = self.load();
        let now = Utc::now().timestamp_millis();

        let already_active = state
            .active_issues
            .iter()
            .any(|issue| issue.email == email && issue.is_active(now));
        if already_active {
            return;
        }

        let record = IssueRecord::new(email, context, now);
        tracing::info!("Recording issue for detected address (id {})", record.id);

        state.active_issues.push(record.clone());
        state.history.push(record);
        self.save(&state);
    }

    /// Append a detection to history only, never to the active set.
    ///
    /// Used for occurrences of currently-suppressed addresses: suppression
    /// stops the re-alert, not the lineage capture. Every call appends a
    /// fresh record.
    pub fn log_history(&self, email: &str, context: Option<&str>) {
        let mut state = self.load();
        let now = Utc::now().timestamp_millis();
        state.history.push(IssueRecord::new(email, context, now));
        self.save(&state);
    }

    /// Suppress the identified issue for the next 24 hours, in both
    /// projections. Absent ids are a no-op, not an error.
    pub fn dismiss(&self, issue_id: &str) {
        let mut state = self.load();
        let until = Utc::now().timestamp_millis() + SUPPRESS_WINDOW_MS;

        for issue in state
            .active_issues
            .iter_mut()
            .chain(state.history.iter_mut())
        {
            if issue.id == issue_id {
                issue.suppressed_until = Some(until);
            }
        }

        self.save(&state);
    }

    /// Active-set entries that are unsuppressed at `now`.
    pub fn active_issues(&self, now: i64) -> Vec<IssueRecord> {
        self.load()
            .active_issues
            .into_iter()
            .filter(|issue| issue.is_active(now))
            .collect()
    }

    /// Full history, insertion order. The presentation layer owns display
    /// ordering.
    pub fn history(&self) -> Vec<IssueRecord> {
        self.load().history
    }

    /// True if history holds this exact address with a suppression window
    /// still open at `now`.
    pub fn is_suppressed(&self, email: &str, now: i64) -> bool {
        self.load().history.iter().any(|issue| {
            issue.email == email
                && matches!(issue.suppressed_until, Some(until) if until > now)
        })
    }

    /// Lowercased addresses currently suppressed. Feeds the detector's
    /// suppression set.
    pub fn suppressed_emails(&self, now: i64) -> Vec<String> {
        let mut seen = HashSet::new();
        self.load()
            .history
            .iter()
            .filter(|issue| matches!(issue.suppressed_until, Some(until) if until > now))
            .filter_map(|issue| {
                let lower = issue.email.to_lowercase();
                seen.insert(lower.clone()).then_some(lower)
            })
            .collect()
    }
}
