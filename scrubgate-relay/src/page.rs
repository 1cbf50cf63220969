use crate::ScanVerdict;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use uuid::Uuid;

/// Hard deadline for hop A. Past this, the page gives up and sends the
/// original text rather than hanging the user's request.
pub const SCAN_DEADLINE: Duration = Duration::from_millis(2500);

/// Everything that travels on the page bus.
#[derive(Debug, Clone)]
pub enum PageMessage {
    ScanRequest { id: String, text: String },
    ScanResponse { id: String, verdict: ScanVerdict },
}

/// Same-document broadcast bus. Every context living in the page can post and
/// subscribe; delivery is at-least-once to live subscribers, unordered across
/// senders.
#[derive(Debug, Clone)]
pub struct PageBus {
    tx: broadcast::Sender<PageMessage>,
}

impl PageBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Post to everyone currently listening. No listeners is not an error.
    pub fn post(&self, msg: PageMessage) {
        let _ = self.tx.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageMessage> {
        self.tx.subscribe()
    }
}

impl Default for PageBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Hop A client: post a scan request and wait for the correlated response.
///
/// Returns `None` (the explicit no-result sentinel) if the deadline fires
/// first. The `select!` below is the single-resolution point: exactly one arm
/// wins, and once resolved the receiver is dropped, so a late or duplicate
/// response has no observable effect.
pub async fn request_scan(
    bus: &PageBus,
    text: &str,
    deadline: Duration,
) -> Option<ScanVerdict> {
    let id = Uuid::new_v4().to_string();

    // Subscribe before posting so the response cannot slip past us.
    let mut rx = bus.subscribe();
    bus.post(PageMessage::ScanRequest {
        id: id.clone(),
        text: text.to_string(),
    });

    let wait_for_response = async {
        loop {
            match rx.recv().await {
                Ok(PageMessage::ScanResponse { id: response_id, verdict })
                    if response_id == id =>
                {
                    return Some(verdict);
                }
                // Our own request echo, or traffic for another correlation id.
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Page bus lagged, skipped {} messages", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };

    tokio::select! {
        verdict = wait_for_response => verdict,
        _ = sleep(deadline) => {
            tracing::warn!("Scan deadline elapsed, releasing request");
            None
        }
    }
}
