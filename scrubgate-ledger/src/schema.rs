/// scrubgate-ledger/src/schema.rs
/// The initial schema for the ScrubGate store.
pub const MIGRATION_INIT: &str = r#"
-- Single key-value surface. The whole issue ledger lives as one serialized
-- JSON object under a fixed key; callers do whole-object read-modify-write.
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
