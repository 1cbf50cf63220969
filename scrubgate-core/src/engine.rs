use crate::background::ScanService;
use crate::interceptor::{GuardedTransport, InstallError, Page};
use crate::request::{is_supported_host, ChatTransport};
use crate::view::LedgerView;
use anyhow::{bail, Result};
use scrubgate_ledger::{IssueLedger, KvStore, MemoryStore, SqliteStore};
use scrubgate_relay::{spawn_bridge, IssueAlert, PageBus, ScanClient, SCAN_DEADLINE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where the durable store lives. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    /// Hard deadline for hop A of the relay.
    pub scan_deadline: Duration,
    /// Hostname of the document the engine mounts on.
    pub host: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            scan_deadline: SCAN_DEADLINE,
            host: "chatgpt.com".to_string(),
        }
    }
}

/// The main entry point. Owns the page handle and the client side of the
/// service channel; the background and bridge tasks run detached.
pub struct ScrubEngine {
    page: Arc<Page>,
    service: ScanClient,
    view: Arc<LedgerView>,
    scan_deadline: Duration,
}

impl ScrubEngine {
    /// Start the engine: open the store, spawn the background service and the
    /// bridge, return the handle plus the alert stream for the presentation
    /// layer.
    pub fn start(config: EngineConfig) -> Result<(Self, mpsc::Receiver<IssueAlert>)> {
        if !is_supported_host(&config.host) {
            bail!("host {:?} is not a supported chat service", config.host);
        }

        let store: Arc<dyn KvStore> = match &config.db_path {
            Some(path) => Arc::new(SqliteStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };

        // Privileged context: the only ledger writer.
        let (service, service_rx) = ScanClient::channel(32);
        ScanService::new(IssueLedger::new(store.clone())).spawn(service_rx);

        // Isolated context: the bridge between page bus and service.
        let bus = PageBus::new();
        let (alert_tx, alert_rx) = mpsc::channel(16);
        spawn_bridge(bus.clone(), service.clone(), alert_tx);

        let page = Arc::new(Page::new(config.host.clone(), bus));
        let view = LedgerView::new(store);

        tracing::info!("ScrubGate engine started on {}", config.host);

        Ok((
            Self {
                page,
                service,
                view,
                scan_deadline: config.scan_deadline,
            },
            alert_rx,
        ))
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// Wrap the page's real transport with the interception pipeline.
    pub fn intercept<T: ChatTransport>(
        &self,
        inner: T,
    ) -> Result<GuardedTransport<T>, InstallError> {
        GuardedTransport::install(&self.page, inner, self.scan_deadline)
    }

    /// Read surface for the presentation layer.
    pub fn ledger_view(&self) -> &Arc<LedgerView> {
        &self.view
    }

    /// Suppress an issue for 24 hours, routed through the privileged context.
    pub async fn dismiss(&self, issue_id: &str) {
        self.service.dismiss(issue_id).await;
    }
}
