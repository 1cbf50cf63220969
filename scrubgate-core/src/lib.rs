//! # ScrubGate Core
//!
//! The interception pipeline: a page-context wrapper around the outgoing chat
//! request, a bridge relay, and the privileged background context that scans
//! and logs. Three contexts, no shared mutable state, message passing only.
//!
//! The prime directive is fail-open: whatever breaks, the user's request goes
//! out unmodified, never blocked.

pub mod background;
pub mod engine;
pub mod interceptor;
pub mod request;
pub mod view;

// Re-export the main entry points so users can just use `scrubgate_core::ScrubEngine`.
pub use engine::{EngineConfig, ScrubEngine};
pub use interceptor::{GuardedTransport, InstallError, Page};
pub use request::{is_supported_host, ChatTransport, OutboundRequest, TransportResponse};
pub use view::LedgerView;
