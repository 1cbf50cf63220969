//! # ScrubGate Relay
//!
//! The two-hop relay that lets the page-context interceptor obtain a scan
//! verdict without holding ledger or detector access itself.
//!
//! Hop A: page context <-> bridge, over a same-document broadcast bus, with a
//! correlation id and a hard deadline on the page side.
//!
//! Hop B: bridge <-> privileged background service, a plain request/response
//! call with a oneshot reply. No relay-layer timeout; the bridge maps every
//! failure to a pass-through verdict so the interception path can never wedge.
//!
//! The two hops have independent deadlines and error domains. End to end, the
//! system fails open: any timeout or failure lets the original text proceed.

use serde::{Deserialize, Serialize};

pub mod bridge;
pub mod page;
pub mod service;

pub use bridge::{spawn_bridge, IssueAlert};
pub use page::{request_scan, PageBus, PageMessage, SCAN_DEADLINE};
pub use service::{ScanClient, ServiceRequest};

/// The result of a scan, as it crosses both hops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanVerdict {
    pub has_issues: bool,
    pub anonymized_text: String,
    pub found_emails: Vec<String>,
    /// Diagnostic only; a populated error still means "proceed with the text
    /// above", never "block".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanVerdict {
    /// The default verdict: no issues, original text untouched.
    pub fn pass_through(text: &str) -> Self {
        Self {
            has_issues: false,
            anonymized_text: text.to_string(),
            found_emails: Vec::new(),
            error: None,
        }
    }

    /// Pass-through with a diagnostic attached.
    pub fn failed(text: &str, error: impl std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::pass_through(text)
        }
    }
}
