//! Audit records and aggregates.

use chrono::{DateTime, SecondsFormat, Utc};
use cl_01_ledger_adapter::{looks_like_content_id, NodeHealth};
use cl_04_credential_lifecycle::ContentStoreStatus;
use primitive_types::U256;
use serde::Serialize;
use shared_types::{Address, Fingerprint, StorageMode, TxHash};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    Registered,
    Revoked,
}

/// One ledger event, enriched with its block time and transaction gas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    pub fingerprint: Fingerprint,
    /// Issuer for registrations; the revoker when the event carries one.
    pub actor: Option<Address>,
    pub recipient: Option<Address>,
    pub pointer: Vec<u8>,
    /// Registrations only. Read from `verifyCredential` when deployed,
    /// otherwise inferred from the pointer.
    pub storage_mode: Option<StorageMode>,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: TxHash,
    /// `None` if the block read failed.
    pub timestamp: Option<u64>,
    /// `None` if the receipt read failed.
    pub gas_used: Option<u64>,
}

impl AuditEvent {
    pub fn timestamp_iso(&self) -> Option<String> {
        self.timestamp.and_then(iso8601)
    }
}

pub fn iso8601(unix_secs: u64) -> Option<String> {
    let secs = i64::try_from(unix_secs).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Fallback for programs whose lookup does not report the storage mode.
pub fn infer_mode(pointer: &[u8]) -> StorageMode {
    if looks_like_content_id(pointer) {
        StorageMode::External
    } else {
        StorageMode::Embedded
    }
}

/// Newest first: block height, then log position, both descending.
pub fn sort_newest_first(events: &mut [AuditEvent]) {
    events.sort_by(|a, b| {
        (b.block_number, b.log_index).cmp(&(a.block_number, a.log_index))
    });
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditTotals {
    pub issued: usize,
    pub revoked: usize,
    /// `min(recent_window, issued + revoked)`.
    pub recent: usize,
    pub embedded: usize,
    pub external: usize,
    /// Summed once per transaction.
    pub cumulative_gas: u64,
}

/// Everything the registry has emitted, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub registered: Vec<AuditEvent>,
    pub revoked: Vec<AuditEvent>,
    /// Newest operations of either kind, at most `recent_window`.
    pub recent: Vec<AuditEvent>,
    pub totals: AuditTotals,
    /// `false` when the deployed program emits no revocation events.
    pub revocations_tracked: bool,
}

impl AuditReport {
    pub fn build(
        mut registered: Vec<AuditEvent>,
        mut revoked: Vec<AuditEvent>,
        recent_window: usize,
        revocations_tracked: bool,
    ) -> Self {
        sort_newest_first(&mut registered);
        sort_newest_first(&mut revoked);

        let external = registered
            .iter()
            .filter(|e| e.storage_mode == Some(StorageMode::External))
            .count();

        let mut recent: Vec<AuditEvent> =
            registered.iter().chain(revoked.iter()).cloned().collect();
        sort_newest_first(&mut recent);
        recent.truncate(recent_window);

        let mut seen: HashSet<TxHash> = HashSet::new();
        let cumulative_gas = registered
            .iter()
            .chain(revoked.iter())
            .filter(|e| seen.insert(e.tx_hash))
            .filter_map(|e| e.gas_used)
            .sum();

        let totals = AuditTotals {
            issued: registered.len(),
            revoked: revoked.len(),
            recent: recent.len(),
            embedded: registered.len() - external,
            external,
            cumulative_gas,
        };
        Self {
            registered,
            revoked,
            recent,
            totals,
            revocations_tracked,
        }
    }

}

/// Current view of one credential, folded from its events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub fingerprint: Fingerprint,
    pub issuer: Address,
    pub recipient: Address,
    pub storage_mode: StorageMode,
    pub pointer: Vec<u8>,
    pub issued_block: u64,
    pub issued_at: Option<String>,
    pub tx_hash: TxHash,
    pub revoked: bool,
    pub revoked_block: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub totals: AuditTotals,
    pub recent: Vec<AuditEvent>,
    pub active: usize,
    pub signer: Option<Address>,
    /// `None` if there is no signer or the balance read failed.
    pub signer_balance: Option<U256>,
    pub ledger_node: NodeHealth,
    pub content_store: ContentStoreStatus,
    pub indexed_height: Option<u64>,
    /// Set when this dashboard was built from a projection that failed to
    /// catch up.
    pub lagging: bool,
}
