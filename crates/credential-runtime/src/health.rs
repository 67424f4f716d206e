//! Operator health snapshot: adapter binding, node and content-store
//! liveness, and the balance of every signing account.

use cl_01_ledger_adapter::{AdapterStatus, NodeHealth};
use cl_04_credential_lifecycle::ContentStoreStatus;
use primitive_types::U256;
use serde::Serialize;
use shared_types::Address;
use tracing::warn;

use crate::container::ServiceContainer;

#[derive(Debug, Clone, Serialize)]
pub struct SignerHealth {
    pub address: Address,
    /// `None` if unbound or the balance read failed.
    pub balance: Option<U256>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub adapter: AdapterStatus,
    pub ledger_node: NodeHealth,
    pub content_store: ContentStoreStatus,
    pub signers: Vec<SignerHealth>,
    /// Bound, node online and at least one signer configured.
    pub ready: bool,
}

impl HealthReport {
    pub async fn collect(container: &ServiceContainer) -> Self {
        let (ledger_node, content_store, signers) = tokio::join!(
            container.adapter.health(),
            container.content.status(),
            signer_balances(container),
        );
        let adapter = container.adapter.status();
        let ready = adapter.bound && ledger_node.is_online() && !signers.is_empty();
        Self {
            adapter,
            ledger_node,
            content_store,
            signers,
            ready,
        }
    }
}

async fn signer_balances(container: &ServiceContainer) -> Vec<SignerHealth> {
    let handle = container.adapter.get_handle();
    let mut out = Vec::new();
    for address in container.keyring.addresses() {
        let balance = match &handle {
            Some(handle) => match handle.balance(address).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    warn!(%address, error = %e, "signer balance unavailable");
                    None
                }
            },
            None => None,
        };
        out.push(SignerHealth { address, balance });
    }
    out
}
