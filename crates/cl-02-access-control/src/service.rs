//! # Access-Control Service
//!
//! Grants and revokes the three fixed roles on the ledger and answers
//! per-role membership checks. The ledger is authoritative for every
//! decision; the local cache is only kept warm.

use cl_01_ledger_adapter::{LedgerAdapter, LedgerError, SignerProvider};
use serde::Serialize;
use shared_types::{
    Address, Classify, Role, RoleSnapshot, RoleStatus, Session, TimeSource, TxHash,
};
use std::sync::Arc;
use tracing::{instrument, warn};

use credential_telemetry::{log_event, metric_inc, ROLE_CHANGES, ROLE_CHECKS_UNKNOWN};

use crate::domain::{AccessError, CachedRoles, RoleCache};

const SUBSYSTEM: &str = "access_control";

/// A confirmed role mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleChange {
    pub target: Address,
    pub role: Role,
    pub granted: bool,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

pub struct AccessControlService {
    adapter: Arc<LedgerAdapter>,
    signers: Arc<dyn SignerProvider>,
    cache: RoleCache,
    clock: Arc<dyn TimeSource>,
}

impl AccessControlService {
    pub fn new(
        adapter: Arc<LedgerAdapter>,
        signers: Arc<dyn SignerProvider>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            adapter,
            signers,
            cache: RoleCache::new(),
            clock,
        }
    }

    #[instrument(skip(self, session), fields(actor = %session.address))]
    pub async fn grant_role(
        &self,
        session: &Session,
        target: Address,
        role: Role,
    ) -> Result<RoleChange, AccessError> {
        self.change_role(session, target, role, true).await
    }

    #[instrument(skip(self, session), fields(actor = %session.address))]
    pub async fn revoke_role(
        &self,
        session: &Session,
        target: Address,
        role: Role,
    ) -> Result<RoleChange, AccessError> {
        self.change_role(session, target, role, false).await
    }

    async fn change_role(
        &self,
        session: &Session,
        target: Address,
        role: Role,
        grant: bool,
    ) -> Result<RoleChange, AccessError> {
        if session.is_expired(self.clock.now()) {
            return Err(AccessError::SessionExpired);
        }
        if !session.can_manage(role) {
            log_event!(
                warn,
                SUBSYSTEM,
                "role change denied",
                actor = %session.address,
                role = %role
            );
            return Err(AccessError::PermissionDenied {
                actor: session.address,
                role,
            });
        }
        if target.is_zero() {
            return Err(AccessError::InvalidTarget(target.to_string()));
        }

        let handle = self.adapter.require_handle()?;
        let signer = self
            .signers
            .signer_for(&session.address)
            .ok_or(AccessError::SignerUnavailable(session.address))?;

        let receipt = if grant {
            handle.grant_role(&signer, role, target).await?
        } else {
            handle.revoke_role(&signer, role, target).await?
        };

        let action = if grant { "grant" } else { "revoke" };
        metric_inc!(ROLE_CHANGES, &[action, role.to_string().as_str()]);
        self.cache.set(
            target,
            role,
            if grant {
                RoleStatus::Present
            } else {
                RoleStatus::Absent
            },
            self.clock.now(),
        );
        log_event!(
            info,
            SUBSYSTEM,
            "role updated",
            target = %target,
            role = %role,
            action,
            tx_hash = %receipt.tx_hash
        );

        Ok(RoleChange {
            target,
            role,
            granted: grant,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    /// One ledger query per role. A failed query yields `Unknown` for that
    /// role only; an unavailable ledger yields `Unknown` for all three.
    #[instrument(skip(self))]
    pub async fn check_roles(&self, address: Address) -> RoleSnapshot {
        let handle = match self.adapter.require_handle() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "role check without a bound ledger");
                ROLE_CHECKS_UNKNOWN.inc_by(Role::ALL.len() as f64);
                return RoleSnapshot::uniform(RoleStatus::Unknown);
            }
        };

        let (admin, issuer, student) = tokio::join!(
            handle.has_role(Role::Admin, address),
            handle.has_role(Role::Issuer, address),
            handle.has_role(Role::Student, address),
        );
        let snapshot = RoleSnapshot {
            admin: status_of(Role::Admin, admin),
            issuer: status_of(Role::Issuer, issuer),
            student: status_of(Role::Student, student),
        };

        self.cache.record(address, &snapshot, self.clock.now());
        snapshot
    }

    /// Advisory cached view; never use for authorization.
    pub fn cached_roles(&self, address: &Address) -> Option<CachedRoles> {
        self.cache.get(address)
    }

    pub fn cached_holders(&self, role: Role) -> Vec<Address> {
        self.cache.holders(role)
    }
}

fn status_of(role: Role, result: Result<bool, LedgerError>) -> RoleStatus {
    match result {
        Ok(true) => RoleStatus::Present,
        Ok(false) => RoleStatus::Absent,
        Err(e) => {
            warn!(%role, error = %e, "role query failed");
            ROLE_CHECKS_UNKNOWN.inc();
            RoleStatus::Unknown
        }
    }
}
