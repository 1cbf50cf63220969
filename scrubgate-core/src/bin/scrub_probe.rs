// scrubgate-core/src/bin/scrub_probe.rs
//
// Manual smoke check: run the whole pipeline in memory over a sample request
// and print what comes out the other side.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use scrubgate_core::{
    ChatTransport, EngineConfig, OutboundRequest, ScrubEngine, TransportResponse,
};

/// A transport that just echoes what it was asked to send.
struct EchoTransport;

#[async_trait]
impl ChatTransport for EchoTransport {
    async fn dispatch(&self, request: OutboundRequest) -> Result<TransportResponse> {
        println!("[scrub_probe] dispatching body: {}", request.body.as_deref().unwrap_or("<none>"));
        Ok(TransportResponse {
            status: 200,
            body: String::new(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    eprintln!("[scrub_probe] starting in-memory pipeline…");

    let (engine, mut alerts) = ScrubEngine::start(EngineConfig::default())?;
    let transport = engine.intercept(EchoTransport)?;

    let body = serde_json::json!({
        "messages": [{
            "role": "user",
            "content": { "parts": ["contact me at Jane.Doe@Example.com please"] }
        }]
    });

    let request = OutboundRequest {
        url: "https://chatgpt.com/backend-api/conversation".to_string(),
        method: "POST".to_string(),
        body: Some(body.to_string()),
    };

    transport.dispatch(request).await?;

    if let Some(alert) = alerts.recv().await {
        println!("[scrub_probe] alert raised for: {:?}", alert.found_emails);
    }

    let now = Utc::now().timestamp_millis();
    engine.ledger_view().refresh();
    for issue in engine.ledger_view().active_issues(now) {
        println!(
            "[scrub_probe] active issue {} email={} context={:?}",
            issue.id, issue.email, issue.context
        );
    }

    Ok(())
}
