//! # ScrubGate Detect
//!
//! The detection leaf. Scans user-authored text for email addresses and
//! rewrites them to a fixed redaction token before the text leaves the page.
//! Pure and synchronous: no storage, no network, no async.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// The token written over every redacted address.
pub const REDACTION_TOKEN: &str = "[EMAIL_ADDRESS]";

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Permissive email pattern: local part, `@`, dotted domain, final label of
/// 2+ letters. A heuristic, not a certified redactor.
fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
            .expect("Invalid Email Regex")
    })
}

/// What a scan produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub has_issues: bool,
    /// Input text with every non-suppressed address replaced by
    /// [`REDACTION_TOKEN`]. Byte-identical to the input when nothing matched.
    pub redacted_text: String,
    /// Addresses that were redacted, originally cased, in first-occurrence
    /// order, deduplicated by exact string.
    pub found_emails: Vec<String>,
    /// Addresses that matched but sat on the suppression list. Left untouched
    /// in the text; the caller decides whether to log them.
    pub suppressed_hits: Vec<String>,
}

/// Scan `text` and redact every email address not on the suppression list.
///
/// `suppressed` holds lowercased addresses; matching against it is
/// case-insensitive while the returned strings keep their original casing.
pub fn scan(text: &str, suppressed: &HashSet<String>) -> ScanOutcome {
    let mut found_emails: Vec<String> = Vec::new();
    let mut suppressed_hits: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut redacted = text.to_string();

    for m in email_regex().find_iter(text) {
        let email = m.as_str();

        // Dedup by exact string; a second occurrence was already handled
        // by the global replace below.
        if !seen.insert(email.to_string()) {
            continue;
        }

        if suppressed.contains(&email.to_lowercase()) {
            suppressed_hits.push(email.to_string());
            continue;
        }

        found_emails.push(email.to_string());

        // Escape the matched string so it is replaced literally, even if the
        // address happens to contain pattern metacharacters.
        let literal = Regex::new(&regex::escape(email))
            .expect("escaped address is a valid pattern");
        redacted = literal.replace_all(&redacted, REDACTION_TOKEN).into_owned();
    }

    ScanOutcome {
        has_issues: !found_emails.is_empty(),
        redacted_text: redacted,
        found_emails,
        suppressed_hits,
    }
}
