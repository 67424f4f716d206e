//! # Ledger Adapter Service
//!
//! Single shared answer to "can we talk to the ledger and where is the
//! program". One `LedgerAdapter` is built per process (or per test) and
//! shared by `Arc`; there is no global instance.
//!
//! Loading artifacts never fails the caller: a missing or invalid artifact is
//! recorded as state and surfaces later as `Unavailable` from
//! [`LedgerAdapter::require_handle`].

use parking_lot::RwLock;
use serde::Serialize;
use shared_types::Address;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::LedgerError;
use crate::domain::interface::{ContractInterface, InterfaceVersion};
use crate::handle::ContractHandle;
use crate::ports::outbound::{ArtifactSource, LedgerRpc, RpcConnector};
use crate::sequencer::{AccountSequencer, SubmitConfig, TransactionSubmitter};

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// JSON-RPC endpoint used by [`LedgerAdapter::refresh`].
    pub endpoint: String,
    pub submit: SubmitConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            submit: SubmitConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
enum Artifact<T> {
    NotLoaded,
    Ready(T),
    Failed(String),
}

impl<T> Artifact<T> {
    fn ready(&self) -> Option<&T> {
        match self {
            Artifact::Ready(v) => Some(v),
            _ => None,
        }
    }

    fn problem(&self, what: &str) -> Option<String> {
        match self {
            Artifact::NotLoaded => Some(format!("{what} not loaded")),
            Artifact::Ready(_) => None,
            Artifact::Failed(e) => Some(format!("{what}: {e}")),
        }
    }
}

struct LedgerConnectionState {
    endpoint: Option<String>,
    rpc: Option<Arc<dyn LedgerRpc>>,
    connect_error: Option<String>,
    interface: Artifact<ContractInterface>,
    address: Artifact<Address>,
    handle: Option<ContractHandle>,
}

/// Snapshot of the adapter for health output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterStatus {
    pub endpoint: Option<String>,
    pub connected: bool,
    pub bound: bool,
    pub program_address: Option<Address>,
    pub interface_version: Option<String>,
    pub last_error: Option<String>,
}

/// Liveness of the ledger node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeHealth {
    Online { chain_id: u64, block_number: u64 },
    Offline { reason: String },
}

impl NodeHealth {
    pub fn is_online(&self) -> bool {
        matches!(self, NodeHealth::Online { .. })
    }
}

pub struct LedgerAdapter {
    config: AdapterConfig,
    connector: Arc<dyn RpcConnector>,
    artifacts: Arc<dyn ArtifactSource>,
    sequencer: Arc<AccountSequencer>,
    state: RwLock<LedgerConnectionState>,
}

impl LedgerAdapter {
    pub fn new(
        config: AdapterConfig,
        connector: Arc<dyn RpcConnector>,
        artifacts: Arc<dyn ArtifactSource>,
    ) -> Self {
        Self {
            config,
            connector,
            artifacts,
            sequencer: Arc::new(AccountSequencer::new()),
            state: RwLock::new(LedgerConnectionState {
                endpoint: None,
                rpc: None,
                connect_error: None,
                interface: Artifact::NotLoaded,
                address: Artifact::NotLoaded,
                handle: None,
            }),
        }
    }

    /// Connect to `endpoint`. No-op when already connected.
    #[instrument(skip(self))]
    pub async fn connect(&self, endpoint: &str) -> Result<(), LedgerError> {
        if self.state.read().rpc.is_some() {
            return Ok(());
        }

        match self.connector.connect(endpoint).await {
            Ok(rpc) => {
                let mut state = self.state.write();
                // A concurrent connect may have won; keep the first client.
                if state.rpc.is_none() {
                    state.rpc = Some(rpc);
                    state.endpoint = Some(endpoint.to_string());
                    state.connect_error = None;
                    info!(endpoint, "connected to ledger node");
                }
                Ok(())
            }
            Err(e) => {
                warn!(endpoint, error = %e, "ledger connection failed");
                self.state.write().connect_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Read and resolve the interface description. Returns whether it loaded.
    pub fn load_interface(&self) -> bool {
        let loaded = self
            .artifacts
            .read_interface()
            .and_then(|doc| ContractInterface::from_json(&doc).map_err(LedgerError::from));

        let mut state = self.state.write();
        match loaded {
            Ok(interface) => {
                state.interface = Artifact::Ready(interface);
                true
            }
            Err(e) => {
                warn!(error = %e, "interface description unavailable");
                state.interface = Artifact::Failed(e.to_string());
                false
            }
        }
    }

    /// Read the deployed program address. Returns whether it loaded.
    pub fn load_address(&self) -> bool {
        let loaded = self.artifacts.read_address().and_then(|raw| {
            let address: Address = raw
                .trim()
                .parse()
                .map_err(|e| LedgerError::Artifact(format!("program address: {e}")))?;
            if address.is_zero() {
                return Err(LedgerError::Artifact("program address is zero".into()));
            }
            Ok(address)
        });

        let mut state = self.state.write();
        match loaded {
            Ok(address) => {
                state.address = Artifact::Ready(address);
                true
            }
            Err(e) => {
                warn!(error = %e, "program address unavailable");
                state.address = Artifact::Failed(e.to_string());
                false
            }
        }
    }

    /// Build the handle iff connected and both artifacts are ready.
    pub fn bind(&self) -> bool {
        let mut state = self.state.write();
        let bound = match (
            state.rpc.clone(),
            state.interface.ready().cloned(),
            state.address.ready().copied(),
        ) {
            (Some(rpc), Some(interface), Some(address)) => {
                let submitter = TransactionSubmitter::new(
                    rpc.clone(),
                    self.sequencer.clone(),
                    self.config.submit.clone(),
                );
                info!(%address, version = ?interface.version(), "registry program bound");
                Some(ContractHandle::new(address, interface, rpc, submitter))
            }
            _ => None,
        };
        state.handle = bound;
        state.handle.is_some()
    }

    /// Connect (if needed), reload both artifacts and rebind. Never fails;
    /// the outcome is visible through [`LedgerAdapter::status`].
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> AdapterStatus {
        let _ = self.connect(&self.config.endpoint).await;
        self.load_interface();
        self.load_address();
        self.bind();
        self.status()
    }

    pub fn get_handle(&self) -> Option<ContractHandle> {
        self.state.read().handle.clone()
    }

    /// The handle, or the reason there is none.
    pub fn require_handle(&self) -> Result<ContractHandle, LedgerError> {
        let state = self.state.read();
        if let Some(handle) = &state.handle {
            return Ok(handle.clone());
        }
        if state.rpc.is_none() {
            return Err(LedgerError::NotConnected);
        }
        let reason = state
            .interface
            .problem("interface description")
            .or_else(|| state.address.problem("program address"))
            .unwrap_or_else(|| "registry program not bound".to_string());
        Err(LedgerError::Unavailable { reason })
    }

    /// Connected RPC client, bound or not.
    pub fn rpc(&self) -> Option<Arc<dyn LedgerRpc>> {
        self.state.read().rpc.clone()
    }

    pub fn status(&self) -> AdapterStatus {
        let state = self.state.read();
        let last_error = state
            .connect_error
            .clone()
            .filter(|_| state.rpc.is_none())
            .or_else(|| state.interface.problem("interface description"))
            .or_else(|| state.address.problem("program address"));
        AdapterStatus {
            endpoint: state.endpoint.clone(),
            connected: state.rpc.is_some(),
            bound: state.handle.is_some(),
            program_address: state.address.ready().copied(),
            interface_version: state.interface.ready().map(|i| match i.version() {
                InterfaceVersion::V1 => "v1".to_string(),
                InterfaceVersion::V2 => "v2".to_string(),
            }),
            last_error,
        }
    }

    /// Probe the node.
    pub async fn health(&self) -> NodeHealth {
        let Some(rpc) = self.rpc() else {
            return NodeHealth::Offline {
                reason: "not connected".to_string(),
            };
        };
        let probe = async {
            let chain_id = rpc.chain_id().await?;
            let block_number = rpc.block_number().await?;
            Ok::<_, LedgerError>(NodeHealth::Online {
                chain_id,
                block_number,
            })
        };
        probe.await.unwrap_or_else(|e| NodeHealth::Offline {
            reason: e.to_string(),
        })
    }
}
