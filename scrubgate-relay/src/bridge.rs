use crate::page::{PageBus, PageMessage};
use crate::service::ScanClient;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Fired toward the presentation layer when a scan found fresh issues.
#[derive(Debug, Clone)]
pub struct IssueAlert {
    pub found_emails: Vec<String>,
}

/// Spawn the isolated-context relay: page bus on one side, scan service on
/// the other.
///
/// For every `ScanRequest` it performs the hop B call (already failure-mapped
/// by [`ScanClient`]), posts the correlated `ScanResponse` back onto the bus,
/// and raises a best-effort alert when the verdict carries issues. A full or
/// closed alert channel never delays the response.
pub fn spawn_bridge(
    bus: PageBus,
    service: ScanClient,
    alerts: mpsc::Sender<IssueAlert>,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        tracing::info!("Bridge relay started");

        loop {
            match rx.recv().await {
                Ok(PageMessage::ScanRequest { id, text }) => {
                    let verdict = service.scan_text(&text).await;

                    if verdict.has_issues {
                        let _ = alerts.try_send(IssueAlert {
                            found_emails: verdict.found_emails.clone(),
                        });
                    }

                    bus.post(PageMessage::ScanResponse { id, verdict });
                }
                // Responses (including our own) are not ours to handle.
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Bridge lagged on page bus, skipped {} messages", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        tracing::info!("Bridge relay stopped");
    })
}
