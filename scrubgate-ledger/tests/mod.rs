use chrono::Utc;
use scrubgate_ledger::{
    IssueLedger, KvStore, LedgerState, MemoryStore, SqliteStore, LEDGER_KEY,
    SUPPRESS_WINDOW_MS,
};
use std::sync::Arc;

fn memory_ledger() -> (IssueLedger, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (IssueLedger::new(store.clone()), store)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// ============================================================================
// Empty / Corrupt Store Tests
// ============================================================================

#[test]
fn test_uninitialized_store_reads_as_empty_ledger() {
    let (ledger, _store) = memory_ledger();
    let state = ledger.load();
    assert!(state.active_issues.is_empty());
    assert!(state.history.is_empty());
    assert!(ledger.active_issues(now_ms()).is_empty());
    assert!(ledger.history().is_empty());
}

#[test]
fn test_corrupt_payload_reads_as_empty_ledger() {
    let (ledger, store) = memory_ledger();
    store.set(LEDGER_KEY, "this is not json").unwrap();
    let state = ledger.load();
    assert!(state.active_issues.is_empty());
    assert!(state.history.is_empty());
}

#[test]
fn test_missing_optional_fields_deserialize() {
    let (ledger, store) = memory_ledger();
    // Hand-written payload without suppressed_until/context.
    store
        .set(
            LEDGER_KEY,
            r#"{"active_issues":[{"id":"x","email":"a@b.co","detected_at":1}],"history":[{"id":"x","email":"a@b.co","detected_at":1}]}"#,
        )
        .unwrap();
    let state = ledger.load();
    assert_eq!(state.active_issues.len(), 1);
    assert!(state.active_issues[0].suppressed_until.is_none());
    assert!(state.active_issues[0].context.is_none());
}

// ============================================================================
// Add / Dedup Tests
// ============================================================================

#[test]
fn test_add_issue_lands_in_both_projections() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", Some("mail bob@example.com now"));

    let state = ledger.load();
    assert_eq!(state.active_issues.len(), 1);
    assert_eq!(state.history.len(), 1);
    // Same record, same id, in both projections.
    assert_eq!(state.active_issues[0].id, state.history[0].id);
    assert_eq!(state.active_issues[0].email, "bob@example.com");
    assert_eq!(
        state.active_issues[0].context.as_deref(),
        Some("mail bob@example.com now")
    );
}

#[test]
fn test_second_add_of_active_email_is_a_full_noop() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", None);
    ledger.add_issue("bob@example.com", None);

    let state = ledger.load();
    assert_eq!(state.active_issues.len(), 1);
    // History untouched too: the dedup boundary is the whole operation.
    assert_eq!(state.history.len(), 1);
}

#[test]
fn test_distinct_emails_do_not_dedup() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", None);
    ledger.add_issue("sue@example.org", None);
    assert_eq!(ledger.load().active_issues.len(), 2);
}

#[test]
fn test_log_history_appends_per_call_and_skips_active_set() {
    let (ledger, _store) = memory_ledger();
    ledger.log_history("bob@example.com", None);
    ledger.log_history("bob@example.com", None);

    let state = ledger.load();
    assert!(state.active_issues.is_empty());
    assert_eq!(state.history.len(), 2);
    // Fresh lineage per occurrence.
    assert_ne!(state.history[0].id, state.history[1].id);
}

// ============================================================================
// Dismiss Lifecycle Tests
// ============================================================================

#[test]
fn test_dismiss_suppresses_now_and_expires_after_window() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", None);
    let id = ledger.load().active_issues[0].id.clone();

    ledger.dismiss(&id);

    let now = now_ms();
    // Excluded immediately.
    assert!(ledger.active_issues(now).is_empty());
    assert!(ledger.is_suppressed("bob@example.com", now));

    // Included again once the window has passed, with no further mutation.
    let after_window = now + SUPPRESS_WINDOW_MS + 60_000;
    let active = ledger.active_issues(after_window);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, id);
    assert!(!ledger.is_suppressed("bob@example.com", after_window));
}

#[test]
fn test_dismiss_updates_both_projections_in_place() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", None);
    let id = ledger.load().active_issues[0].id.clone();

    ledger.dismiss(&id);

    let state = ledger.load();
    assert!(state.active_issues[0].suppressed_until.is_some());
    assert!(state.history[0].suppressed_until.is_some());
    // No record was deleted or duplicated.
    assert_eq!(state.active_issues.len(), 1);
    assert_eq!(state.history.len(), 1);
}

#[test]
fn test_dismiss_unknown_id_is_a_noop() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", None);
    ledger.dismiss("no-such-id");

    let state = ledger.load();
    assert!(state.active_issues[0].suppressed_until.is_none());
}

#[test]
fn test_redetection_after_dismiss_is_allowed_into_active_set() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", None);
    let id = ledger.load().active_issues[0].id.clone();
    ledger.dismiss(&id);

    // The prior record is suppressed, so a new detection is not a dup.
    ledger.add_issue("bob@example.com", None);

    let state = ledger.load();
    assert_eq!(state.active_issues.len(), 2);
    assert_eq!(state.history.len(), 2);
}

// ============================================================================
// Suppression Query Tests
// ============================================================================

#[test]
fn test_suppressed_emails_lowercases_and_dedups() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("Bob@Example.COM", None);
    let id = ledger.load().active_issues[0].id.clone();
    ledger.dismiss(&id);
    // A suppressed occurrence logged again while the window is open.
    ledger.log_history("Bob@Example.COM", None);
    // log_history records carry no suppression; dismiss the fresh one too.
    let second_id = ledger.load().history[1].id.clone();
    ledger.dismiss(&second_id);

    let suppressed = ledger.suppressed_emails(now_ms());
    assert_eq!(suppressed, vec!["bob@example.com"]);
}

#[test]
fn test_is_suppressed_matches_exact_email_only() {
    let (ledger, _store) = memory_ledger();
    ledger.add_issue("bob@example.com", None);
    let id = ledger.load().active_issues[0].id.clone();
    ledger.dismiss(&id);

    let now = now_ms();
    assert!(ledger.is_suppressed("bob@example.com", now));
    assert!(!ledger.is_suppressed("sue@example.org", now));
}

// ============================================================================
// Change Notification Tests
// ============================================================================

#[test]
fn test_set_notifies_all_subscribers() {
    let (ledger, store) = memory_ledger();
    let mut rx_a = store.subscribe();
    let mut rx_b = store.subscribe();

    ledger.add_issue("bob@example.com", None);

    assert_eq!(rx_a.try_recv().unwrap().key, LEDGER_KEY);
    assert_eq!(rx_b.try_recv().unwrap().key, LEDGER_KEY);
}

#[tokio::test]
async fn test_subscriber_task_wakes_on_write() {
    let (ledger, store) = memory_ledger();
    let mut rx = store.subscribe();

    let waiter = tokio::spawn(async move { rx.recv().await });

    ledger.add_issue("bob@example.com", None);

    let change = waiter.await.unwrap().unwrap();
    assert_eq!(change.key, LEDGER_KEY);
}

// ============================================================================
// SqliteStore Tests
// ============================================================================

#[test]
fn test_sqlite_store_roundtrip_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scrubgate.db");

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let ledger = IssueLedger::new(store);
        ledger.add_issue("bob@example.com", Some("context"));
    }

    // Fresh handle over the same file sees the persisted ledger.
    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let ledger = IssueLedger::new(store);
    let state: LedgerState = ledger.load();
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history[0].email, "bob@example.com");
}

#[test]
fn test_sqlite_store_get_absent_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("scrubgate.db")).unwrap();
    assert!(store.get("nope").unwrap().is_none());
}

#[test]
fn test_sqlite_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("scrubgate.db")).unwrap();
    store.set("k", "one").unwrap();
    store.set("k", "two").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
}
