//! Lifecycle results and local records.

use cl_01_ledger_adapter::{OnChainCredential, UnsignedTransaction};
use primitive_types::U256;
use serde::Serialize;
use shared_crypto::sha256;
use shared_types::{Address, Fingerprint, StorageMode, TxHash};

/// SHA-256 of the raw content.
pub fn fingerprint_of(content: &[u8]) -> Fingerprint {
    Fingerprint(sha256(content))
}

/// A credential confirmed on the ledger, with what it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCredential {
    pub credential: OnChainCredential,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub effective_gas_price: U256,
    pub total_cost: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevokedCredential {
    pub fingerprint: Fingerprint,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Read-only verification answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub fingerprint: Fingerprint,
    pub exists: bool,
    pub issuer: Address,
    pub recipient: Address,
    pub issued_at: u64,
    pub storage_mode: StorageMode,
    pub pointer: Vec<u8>,
    pub is_revoked: bool,
    pub is_valid: bool,
}

impl From<OnChainCredential> for Verification {
    fn from(c: OnChainCredential) -> Self {
        Self {
            fingerprint: c.fingerprint,
            exists: true,
            issuer: c.issuer,
            recipient: c.recipient,
            issued_at: c.issued_at,
            storage_mode: c.storage_mode,
            is_valid: c.is_valid(),
            is_revoked: c.is_revoked,
            pointer: c.pointer,
        }
    }
}

/// Unsigned registration for client-side signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedIssue {
    pub fingerprint: Fingerprint,
    pub transaction: UnsignedTransaction,
}

/// External upload whose ledger registration never confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedUpload {
    pub pointer: String,
    pub fingerprint: Fingerprint,
    pub issuer: Address,
    pub recorded_at: u64,
    pub reason: String,
}

/// Local, non-authoritative mirror of a credential transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub fingerprint: Fingerprint,
    /// Last transaction that touched the credential.
    pub tx_hash: TxHash,
    pub issuer: Address,
    pub recipient: Address,
    pub storage_mode: StorageMode,
    pub revoked: bool,
    pub updated_at: u64,
    /// Set when a ledger read disagreed with this record.
    pub stale: bool,
}

impl TransactionRecord {
    pub fn agrees_with(&self, c: &OnChainCredential) -> bool {
        self.issuer == c.issuer && self.recipient == c.recipient && self.revoked == c.is_revoked
    }
}
