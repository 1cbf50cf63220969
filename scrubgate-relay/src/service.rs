use crate::ScanVerdict;
use tokio::sync::{mpsc, oneshot};

/// Requests into the privileged background context. Each carries its own
/// oneshot reply slot; dropping the slot is a visible failure to the caller.
#[derive(Debug)]
pub enum ServiceRequest {
    ScanText {
        text: String,
        reply: oneshot::Sender<ScanVerdict>,
    },
    Dismiss {
        issue_id: String,
        reply: oneshot::Sender<()>,
    },
}

/// Hop B handle. Cheap to clone; every failure mode maps to a pass-through
/// verdict at this boundary so callers never see an error they would have to
/// absorb themselves.
#[derive(Debug, Clone)]
pub struct ScanClient {
    tx: mpsc::Sender<ServiceRequest>,
}

impl ScanClient {
    /// Build the client plus the receiver the background service will drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServiceRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Ask the background context to scan `text`. No timeout here: the call
    /// is bounded by the background's own completion or death, and death maps
    /// to pass-through.
    pub async fn scan_text(&self, text: &str) -> ScanVerdict {
        let (reply, response) = oneshot::channel();
        let request = ServiceRequest::ScanText {
            text: text.to_string(),
            reply,
        };

        if self.tx.send(request).await.is_err() {
            tracing::warn!("Scan service unavailable, passing text through");
            return ScanVerdict::failed(text, "scan service unavailable");
        }

        match response.await {
            Ok(verdict) => verdict,
            Err(_) => {
                tracing::warn!("Scan service dropped the request, passing text through");
                ScanVerdict::failed(text, "scan service dropped the request")
            }
        }
    }

    /// Ask the background context to suppress an issue. Best-effort: a dead
    /// service means the dismissal is simply lost.
    pub async fn dismiss(&self, issue_id: &str) {
        let (reply, response) = oneshot::channel();
        let request = ServiceRequest::Dismiss {
            issue_id: issue_id.to_string(),
            reply,
        };

        if self.tx.send(request).await.is_err() {
            tracing::warn!("Scan service unavailable, dismiss dropped");
            return;
        }
        let _ = response.await;
    }
}
