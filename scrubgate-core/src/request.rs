use async_trait::async_trait;

/// The single endpoint path this pipeline patches. Nothing else is touched.
pub const CONVERSATION_PATH: &str = "/conversation";

/// Chat-service hostnames the interceptor is allowed to mount on.
pub const SUPPORTED_HOSTS: [&str; 2] = ["chatgpt.com", "chat.openai.com"];

pub fn is_supported_host(host: &str) -> bool {
    SUPPORTED_HOSTS.iter().any(|h| *h == host)
}

/// An outgoing chat request as the page is about to send it.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The page's real network call. The interceptor wraps an implementation of
/// this; the crate itself never originates traffic.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn dispatch(&self, request: OutboundRequest) -> anyhow::Result<TransportResponse>;
}
