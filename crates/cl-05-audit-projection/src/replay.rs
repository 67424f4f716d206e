//! Event fetch and enrichment.
//!
//! Each event gets its block timestamp and the gas of the transaction that
//! emitted it. Those reads fail independently: a failed read leaves `None`
//! for that field and the event is kept.

use cl_01_ledger_adapter::{ContractHandle, RegistryEvent};
use shared_types::{Fingerprint, StorageMode, TxHash};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use credential_telemetry::{time_histogram, AUDIT_REPLAY_DURATION};

use crate::domain::{infer_mode, AuditError, AuditEvent, AuditEventKind, AuditReport};

/// Registered and revoked events in `[from_block, to_block]`, enriched,
/// unsorted.
pub async fn fetch_enriched(
    handle: &ContractHandle,
    from_block: u64,
    to_block: Option<u64>,
) -> Result<(Vec<AuditEvent>, Vec<AuditEvent>), AuditError> {
    let (registered, revoked) = tokio::join!(
        handle.registered_events(from_block, to_block),
        handle.revoked_events(from_block, to_block),
    );
    let registered = registered?;
    let revoked = revoked?;

    let mut enricher = Enricher::new(handle);
    let mut out_registered = Vec::with_capacity(registered.len());
    for event in registered {
        out_registered.push(enricher.enrich(event).await);
    }
    let mut out_revoked = Vec::with_capacity(revoked.len());
    for event in revoked {
        out_revoked.push(enricher.enrich(event).await);
    }
    Ok((out_registered, out_revoked))
}

/// Reconstructs the full history from genesis.
#[instrument(skip(handle))]
pub async fn replay_full(
    handle: &ContractHandle,
    recent_window: usize,
) -> Result<AuditReport, AuditError> {
    let _timer = time_histogram!(AUDIT_REPLAY_DURATION);
    let (registered, revoked) = fetch_enriched(handle, 0, None).await?;
    debug!(
        registered = registered.len(),
        revoked = revoked.len(),
        "full replay complete"
    );
    Ok(AuditReport::build(
        registered,
        revoked,
        recent_window,
        handle.capabilities().revocation_events,
    ))
}

/// Memoizes block and receipt reads within one pass.
struct Enricher<'a> {
    handle: &'a ContractHandle,
    timestamps: HashMap<u64, Option<u64>>,
    gas: HashMap<TxHash, Option<u64>>,
}

impl<'a> Enricher<'a> {
    fn new(handle: &'a ContractHandle) -> Self {
        Self {
            handle,
            timestamps: HashMap::new(),
            gas: HashMap::new(),
        }
    }

    async fn enrich(&mut self, event: RegistryEvent) -> AuditEvent {
        let location = *event.location();
        let timestamp = self.timestamp(location.block_number).await;
        let gas_used = self.gas_used(location.tx_hash).await;

        let (kind, fingerprint, actor, recipient, pointer) = match event {
            RegistryEvent::Registered {
                fingerprint,
                issuer,
                recipient,
                pointer,
                ..
            } => (
                AuditEventKind::Registered,
                fingerprint,
                Some(issuer),
                Some(recipient),
                pointer,
            ),
            RegistryEvent::Revoked {
                fingerprint, actor, ..
            } => (AuditEventKind::Revoked, fingerprint, actor, None, Vec::new()),
        };
        let storage_mode = match kind {
            AuditEventKind::Registered => Some(self.storage_mode(&fingerprint, &pointer).await),
            AuditEventKind::Revoked => None,
        };

        AuditEvent {
            kind,
            fingerprint,
            actor,
            recipient,
            pointer,
            storage_mode,
            block_number: location.block_number,
            log_index: location.log_index,
            tx_hash: location.tx_hash,
            timestamp,
            gas_used,
        }
    }

    async fn timestamp(&mut self, block: u64) -> Option<u64> {
        if let Some(cached) = self.timestamps.get(&block) {
            return *cached;
        }
        let value = match self.handle.block_timestamp(block).await {
            Ok(ts) => ts,
            Err(e) => {
                warn!(block, error = %e, "block timestamp unavailable");
                None
            }
        };
        self.timestamps.insert(block, value);
        value
    }

    /// The mode recorded on the ledger; the event itself does not carry it.
    async fn storage_mode(&self, fingerprint: &Fingerprint, pointer: &[u8]) -> StorageMode {
        if !self.handle.capabilities().verify_credential {
            return infer_mode(pointer);
        }
        match self.handle.verify_credential(fingerprint).await {
            Ok(Some(credential)) => credential.storage_mode,
            Ok(None) => infer_mode(pointer),
            Err(e) => {
                warn!(%fingerprint, error = %e, "storage mode unavailable, inferring");
                infer_mode(pointer)
            }
        }
    }

    async fn gas_used(&mut self, tx_hash: TxHash) -> Option<u64> {
        if let Some(cached) = self.gas.get(&tx_hash) {
            return *cached;
        }
        let value = match self.handle.receipt(tx_hash).await {
            Ok(receipt) => receipt.map(|r| r.gas_used),
            Err(e) => {
                warn!(%tx_hash, error = %e, "receipt unavailable");
                None
            }
        };
        self.gas.insert(tx_hash, value);
        value
    }
}
