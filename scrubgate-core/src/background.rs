use chrono::Utc;
use scrubgate_detect::scan;
use scrubgate_ledger::IssueLedger;
use scrubgate_relay::{ScanVerdict, ServiceRequest};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Advisory context snippets are capped at this many characters.
pub const CONTEXT_SNIPPET_MAX: usize = 100;

/// The privileged background context: the only writer to the ledger.
///
/// Page and bridge never see this struct; they reach it through the service
/// channel only.
pub struct ScanService {
    ledger: IssueLedger,
}

impl ScanService {
    pub fn new(ledger: IssueLedger) -> Self {
        Self { ledger }
    }

    /// Drain the service channel until every client handle is dropped.
    pub fn spawn(self, mut rx: mpsc::Receiver<ServiceRequest>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Background scan service started");

            while let Some(request) = rx.recv().await {
                match request {
                    ServiceRequest::ScanText { text, reply } => {
                        let verdict = self.handle_scan(&text);
                        let _ = reply.send(verdict);
                    }
                    ServiceRequest::Dismiss { issue_id, reply } => {
                        self.ledger.dismiss(&issue_id);
                        let _ = reply.send(());
                    }
                }
            }

            tracing::info!("Background scan service stopped");
        })
    }

    /// The full scan-and-log sequence: suppression list, detector, ledger.
    /// Ledger failures are already absorbed below this level; the verdict is
    /// always well-formed.
    fn handle_scan(&self, text: &str) -> ScanVerdict {
        if text.is_empty() {
            return ScanVerdict::pass_through(text);
        }

        let now = Utc::now().timestamp_millis();
        let suppressed: HashSet<String> =
            self.ledger.suppressed_emails(now).into_iter().collect();

        let outcome = scan(text, &suppressed);
        let snippet = snippet(text);

        for email in &outcome.found_emails {
            self.ledger.add_issue(email, Some(&snippet));
        }
        // Suppression stops the re-alert, not the lineage capture.
        for email in &outcome.suppressed_hits {
            self.ledger.log_history(email, Some(&snippet));
        }

        if outcome.has_issues {
            tracing::info!(
                "Scan redacted {} address(es)",
                outcome.found_emails.len()
            );
        }

        ScanVerdict {
            has_issues: outcome.has_issues,
            anonymized_text: outcome.redacted_text,
            found_emails: outcome.found_emails,
            error: None,
        }
    }
}

fn snippet(text: &str) -> String {
    if text.chars().count() > CONTEXT_SNIPPET_MAX {
        let cut: String = text.chars().take(CONTEXT_SNIPPET_MAX).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
