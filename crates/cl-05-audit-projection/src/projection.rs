//! # Audit Projection
//!
//! In-memory index of registry events, keyed by fingerprint and kept current
//! by [`AuditProjection::catch_up`], which folds in only the blocks after the
//! last indexed one. Lost on restart; the next catch-up starts from genesis.

use cl_01_ledger_adapter::ContractHandle;
use parking_lot::RwLock;
use serde::Serialize;
use shared_types::{Address, Fingerprint};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use credential_telemetry::PROJECTION_HEIGHT;

use crate::domain::{
    infer_mode, iso8601, sort_newest_first, AuditError, AuditEvent, AuditEventKind, AuditReport,
    CredentialSummary,
};
use crate::replay::fetch_enriched;

/// What one catch-up folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatchUp {
    pub from_block: u64,
    pub to_block: u64,
    pub new_events: usize,
}

#[derive(Debug, Default)]
struct ProjectionState {
    credentials: HashMap<Fingerprint, CredentialSummary>,
    registered: Vec<AuditEvent>,
    revoked: Vec<AuditEvent>,
    /// Next block to fetch.
    next_block: u64,
    revocations_tracked: bool,
}

#[derive(Debug, Default)]
pub struct AuditProjection {
    state: RwLock<ProjectionState>,
    /// One catch-up at a time.
    catch_up_lock: Mutex<()>,
}

impl AuditProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in every event from the block after the last indexed one up to
    /// the current head.
    #[instrument(skip(self, handle))]
    pub async fn catch_up(&self, handle: &ContractHandle) -> Result<CatchUp, AuditError> {
        let _guard = self.catch_up_lock.lock().await;

        let from_block = self.state.read().next_block;
        let head = handle.block_number().await?;
        if from_block > head {
            return Ok(CatchUp {
                from_block,
                to_block: head,
                new_events: 0,
            });
        }

        let (mut registered, mut revoked) = fetch_enriched(handle, from_block, Some(head)).await?;
        registered.sort_by_key(|e| (e.block_number, e.log_index));
        revoked.sort_by_key(|e| (e.block_number, e.log_index));
        let new_events = registered.len() + revoked.len();

        let mut state = self.state.write();
        for event in registered {
            state.apply_registered(event);
        }
        for event in revoked {
            state.apply_revoked(event);
        }
        state.next_block = head + 1;
        state.revocations_tracked = handle.capabilities().revocation_events;
        drop(state);

        PROJECTION_HEIGHT.set(head as f64);
        debug!(from_block, head, new_events, "projection caught up");
        Ok(CatchUp {
            from_block,
            to_block: head,
            new_events,
        })
    }

    /// Last indexed block, if any catch-up has run.
    pub fn height(&self) -> Option<u64> {
        self.state.read().next_block.checked_sub(1)
    }

    pub fn report(&self, recent_window: usize) -> AuditReport {
        let state = self.state.read();
        AuditReport::build(
            state.registered.clone(),
            state.revoked.clone(),
            recent_window,
            state.revocations_tracked,
        )
    }

    /// Every known credential, newest registration first.
    pub fn list_credentials(&self) -> Vec<CredentialSummary> {
        let mut all: Vec<_> = self.state.read().credentials.values().cloned().collect();
        all.sort_by(|a, b| b.issued_block.cmp(&a.issued_block));
        all
    }

    pub fn credentials_for_recipient(&self, recipient: Address) -> Vec<CredentialSummary> {
        let mut mine: Vec<_> = self
            .state
            .read()
            .credentials
            .values()
            .filter(|c| c.recipient == recipient)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.issued_block.cmp(&a.issued_block));
        mine
    }

    pub fn credential(&self, fingerprint: &Fingerprint) -> Option<CredentialSummary> {
        self.state.read().credentials.get(fingerprint).cloned()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        let state = self.state.read();
        let mut all: Vec<_> = state
            .registered
            .iter()
            .chain(state.revoked.iter())
            .cloned()
            .collect();
        sort_newest_first(&mut all);
        all
    }
}

impl ProjectionState {
    fn apply_registered(&mut self, event: AuditEvent) {
        debug_assert_eq!(event.kind, AuditEventKind::Registered);
        self.credentials.insert(
            event.fingerprint,
            CredentialSummary {
                fingerprint: event.fingerprint,
                issuer: event.actor.unwrap_or_default(),
                recipient: event.recipient.unwrap_or_default(),
                storage_mode: event
                    .storage_mode
                    .unwrap_or_else(|| infer_mode(&event.pointer)),
                pointer: event.pointer.clone(),
                issued_block: event.block_number,
                issued_at: event.timestamp.and_then(iso8601),
                tx_hash: event.tx_hash,
                revoked: false,
                revoked_block: None,
            },
        );
        self.registered.push(event);
    }

    fn apply_revoked(&mut self, event: AuditEvent) {
        if let Some(summary) = self.credentials.get_mut(&event.fingerprint) {
            summary.revoked = true;
            summary.revoked_block = Some(event.block_number);
        }
        self.revoked.push(event);
    }
}
