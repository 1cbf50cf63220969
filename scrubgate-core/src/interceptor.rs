use crate::request::{
    is_supported_host, ChatTransport, OutboundRequest, TransportResponse, CONVERSATION_PATH,
};
use anyhow::anyhow;
use async_trait::async_trait;
use scrubgate_relay::{page::request_scan, PageBus};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One logical document: its message bus plus the one-time install flag for
/// the interceptor.
#[derive(Debug)]
pub struct Page {
    host: String,
    bus: PageBus,
    interceptor_installed: AtomicBool,
}

impl Page {
    pub fn new(host: impl Into<String>, bus: PageBus) -> Self {
        Self {
            host: host.into(),
            bus,
            interceptor_installed: AtomicBool::new(false),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn bus(&self) -> &PageBus {
        &self.bus
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("interceptor already installed on this page")]
    AlreadyInstalled,
    #[error("host {0:?} is not a supported chat service")]
    UnsupportedHost(String),
}

/// The user message the body walk found, with enough context to write the
/// redacted text back into the exact same slot.
struct Candidate {
    text: String,
    body: Value,
    message_index: usize,
}

/// Wraps the page's outgoing call: qualifying requests are held until a scan
/// verdict arrives (or the deadline fires), then dispatched with the body
/// rewritten if anything was found. Everything else passes straight through.
#[derive(Debug)]
pub struct GuardedTransport<T> {
    inner: T,
    bus: PageBus,
    deadline: Duration,
}

impl<T> GuardedTransport<T> {
    /// Install the interceptor on a page. Succeeds exactly once per page, and
    /// only on supported chat-service hosts.
    pub fn install(page: &Page, inner: T, deadline: Duration) -> Result<Self, InstallError> {
        if !is_supported_host(page.host()) {
            return Err(InstallError::UnsupportedHost(page.host().to_string()));
        }
        if page
            .interceptor_installed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Interceptor already installed, skipping");
            return Err(InstallError::AlreadyInstalled);
        }

        tracing::info!("Interceptor installed on {}", page.host());
        Ok(Self {
            inner,
            bus: page.bus().clone(),
            deadline,
        })
    }

    /// Inspect and possibly rewrite one request. Never fails: any problem
    /// during inspection or relay means the original goes through.
    async fn prepare(&self, request: OutboundRequest) -> OutboundRequest {
        let Some(candidate) = qualify(&request) else {
            return request;
        };

        tracing::debug!("Intercepted user message, requesting scan");
        match request_scan(&self.bus, &candidate.text, self.deadline).await {
            Some(verdict) if verdict.has_issues => {
                match rewrite(candidate, &verdict.anonymized_text) {
                    Ok(body) => {
                        tracing::info!("Outgoing payload rewritten with redacted text");
                        OutboundRequest {
                            body: Some(body),
                            ..request
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Rewrite failed, sending original: {}", e);
                        request
                    }
                }
            }
            // No issues, a verdict-with-error, or the deadline sentinel.
            _ => request,
        }
    }
}

#[async_trait]
impl<T: ChatTransport> ChatTransport for GuardedTransport<T> {
    async fn dispatch(&self, request: OutboundRequest) -> anyhow::Result<TransportResponse> {
        let request = self.prepare(request).await;
        self.inner.dispatch(request).await
    }
}

/// Decide whether this request qualifies for scanning, and if so dig out the
/// first user-authored message text. Malformed anything means "no".
fn qualify(request: &OutboundRequest) -> Option<Candidate> {
    if request.method != "POST" || !request.url.contains(CONVERSATION_PATH) {
        return None;
    }
    let raw = request.body.as_deref()?;
    let body: Value = serde_json::from_str(raw).ok()?;
    let messages = body.get("messages")?.as_array()?;

    for (message_index, message) in messages.iter().enumerate() {
        // Only user-authored content; the role lives in either place.
        let role = message
            .get("role")
            .and_then(Value::as_str)
            .or_else(|| {
                message
                    .get("author")
                    .and_then(|author| author.get("role"))
                    .and_then(Value::as_str)
            });
        if role != Some("user") {
            continue;
        }

        let parts = message
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array);
        let Some(parts) = parts else { continue };

        // The first part is the text we care about.
        if let Some(text) = parts.first().and_then(Value::as_str) {
            return Some(Candidate {
                text: text.to_string(),
                body: body.clone(),
                message_index,
            });
        }
    }

    None
}

/// Write the redacted text back into the exact slot the candidate came from
/// and re-serialize the body.
fn rewrite(mut candidate: Candidate, redacted: &str) -> anyhow::Result<String> {
    let slot = candidate
        .body
        .get_mut("messages")
        .and_then(|messages| messages.get_mut(candidate.message_index))
        .and_then(|message| message.get_mut("content"))
        .and_then(|content| content.get_mut("parts"))
        .and_then(|parts| parts.get_mut(0))
        .ok_or_else(|| anyhow!("message slot vanished during rewrite"))?;

    *slot = Value::String(redacted.to_string());
    Ok(serde_json::to_string(&candidate.body)?)
}
