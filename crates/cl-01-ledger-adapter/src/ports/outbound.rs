//! # Driven Ports (SPI - Outbound)
//!
//! What the ledger adapter needs from the outside world:
//! - A JSON-RPC speaking node (`LedgerRpc`), reached through an `RpcConnector`
//! - Deployment artifacts (`ArtifactSource`)
//! - Signing keys for sending accounts (`SignerProvider`)

use async_trait::async_trait;
use primitive_types::U256;
use shared_crypto::{Keyring, SigningAccount};
use shared_types::{Address, TxHash};
use std::sync::Arc;

use crate::domain::entities::{BlockInfo, CallRequest, LogEntry, LogFilter, Receipt};
use crate::domain::errors::LedgerError;

// =============================================================================
// LEDGER NODE
// =============================================================================

/// The subset of the Ethereum JSON-RPC surface the registry client uses.
///
/// Implementations surface a revert from `call` or `send_raw_transaction`
/// as [`LedgerError::Reverted`] with the decoded reason when the node
/// provides one.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, LedgerError>;

    /// `eth_blockNumber`
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// `eth_call` against the latest block.
    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError>;

    /// `eth_estimateGas` against the latest block. Reverts surface the same
    /// way as from `call`.
    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, LedgerError>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, LedgerError>;

    /// `eth_getTransactionCount`, `pending` or `latest`.
    async fn transaction_count(&self, address: Address, pending: bool)
        -> Result<u64, LedgerError>;

    /// `eth_gasPrice`
    async fn gas_price(&self) -> Result<U256, LedgerError>;

    /// `eth_getTransactionReceipt`; `None` while pending.
    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, LedgerError>;

    /// `eth_getLogs`
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError>;

    /// `eth_getBlockByNumber` without transaction bodies.
    async fn block(&self, number: u64) -> Result<Option<BlockInfo>, LedgerError>;

    /// `eth_getBalance` at latest.
    async fn balance(&self, address: Address) -> Result<U256, LedgerError>;
}

/// Opens a [`LedgerRpc`] for an endpoint.
///
/// Connecting is expected to prove reachability (e.g. by fetching the chain
/// id); a connector that hands back a dead client defeats the availability
/// tracking in `LedgerAdapter`.
#[async_trait]
pub trait RpcConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn LedgerRpc>, LedgerError>;
}

// =============================================================================
// ARTIFACTS
// =============================================================================

/// Deployment artifacts: the interface description and the program address.
pub trait ArtifactSource: Send + Sync {
    /// Raw JSON ABI document.
    fn read_interface(&self) -> Result<String, LedgerError>;

    /// Raw address text, possibly with surrounding whitespace.
    fn read_address(&self) -> Result<String, LedgerError>;
}

// =============================================================================
// SIGNERS
// =============================================================================

pub trait SignerProvider: Send + Sync {
    fn signer_for(&self, address: &Address) -> Option<Arc<SigningAccount>>;
}

impl SignerProvider for Keyring {
    fn signer_for(&self, address: &Address) -> Option<Arc<SigningAccount>> {
        self.get(address)
    }
}
