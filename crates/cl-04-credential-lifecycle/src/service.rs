//! # Credential Service
//!
//! Per-fingerprint state machine:
//!
//! ```text
//! Unregistered --issue--> Active --revoke--> Revoked
//! ```
//!
//! Role gates run before any ledger call or upload. The ledger decides
//! uniqueness and revocation; the mirror only follows.

use cl_01_ledger_adapter::{
    ContractHandle, LedgerAdapter, OnChainCredential, SignerProvider, UnsignedTransaction,
};
use shared_crypto::SigningAccount;
use shared_types::{Address, Classify, Fingerprint, Role, Session, StorageMode, TimeSource};
use std::sync::Arc;
use tracing::{instrument, warn};

use credential_telemetry::{
    log_credential_event, metric_inc, CREDENTIALS_ISSUED, CREDENTIALS_REVOKED,
    LIFECYCLE_FAILURES, ORPHANED_UPLOADS,
};

use crate::domain::{
    fingerprint_of, IssuedCredential, LifecycleError, OrphanRegistry, OrphanedUpload,
    PreparedIssue, RevokedCredential, TransactionRecord, Verification,
};
use crate::ports::{ContentStore, TransactionMirror};

const SUBSYSTEM: &str = "credential_lifecycle";

/// Default ceiling for Embedded payloads. Registering this many bytes stays
/// under the default 2M gas limit (`gas::registration_upper_bound`).
pub const DEFAULT_EMBEDDED_LIMIT_BYTES: usize = 2 * 1024;

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub embedded_limit_bytes: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            embedded_limit_bytes: DEFAULT_EMBEDDED_LIMIT_BYTES,
        }
    }
}

pub struct CredentialService {
    config: LifecycleConfig,
    adapter: Arc<LedgerAdapter>,
    signers: Arc<dyn SignerProvider>,
    content: Arc<dyn ContentStore>,
    mirror: Arc<dyn TransactionMirror>,
    orphans: OrphanRegistry,
    clock: Arc<dyn TimeSource>,
}

impl CredentialService {
    pub fn new(
        config: LifecycleConfig,
        adapter: Arc<LedgerAdapter>,
        signers: Arc<dyn SignerProvider>,
        content: Arc<dyn ContentStore>,
        mirror: Arc<dyn TransactionMirror>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            adapter,
            signers,
            content,
            mirror,
            orphans: OrphanRegistry::new(),
            clock,
        }
    }

    // =========================================================================
    // ISSUE
    // =========================================================================

    /// Registers `content` for `recipient`.
    ///
    /// External content is uploaded before the ledger transaction. If the
    /// transaction then fails, the upload is recorded as orphaned.
    #[instrument(
        skip(self, session, content),
        fields(issuer = %session.address, size = content.len())
    )]
    pub async fn issue(
        &self,
        session: &Session,
        recipient: Address,
        content: &[u8],
        storage_mode: StorageMode,
    ) -> Result<IssuedCredential, LifecycleError> {
        let result = self
            .issue_inner(session, recipient, content, storage_mode)
            .await;
        if let Err(e) = &result {
            record_failure("issue", e);
        }
        result
    }

    async fn issue_inner(
        &self,
        session: &Session,
        recipient: Address,
        content: &[u8],
        storage_mode: StorageMode,
    ) -> Result<IssuedCredential, LifecycleError> {
        self.require_issuer(session)?;
        if content.is_empty() {
            return Err(LifecycleError::InvalidRequest("empty content".into()));
        }
        if recipient.is_zero() {
            return Err(LifecycleError::InvalidRequest(
                "recipient must not be the zero address".into(),
            ));
        }
        if storage_mode == StorageMode::Embedded {
            self.check_embedded_size(content.len())?;
        }

        let fingerprint = fingerprint_of(content);
        let handle = self.adapter.require_handle()?;
        let signer = self.signer(session.address)?;

        // Early duplicate check so a known credential never triggers an upload.
        // The ledger still enforces uniqueness at registration.
        if handle.get_credential(&fingerprint).await?.is_some() {
            return Err(LifecycleError::Conflict(format!(
                "credential {fingerprint} already exists"
            )));
        }

        let pointer = match storage_mode {
            StorageMode::Embedded => content.to_vec(),
            StorageMode::External => self.content.add(content).await?.into_bytes(),
        };

        let receipt = match handle
            .register_credential(&signer, &fingerprint, recipient, &pointer, storage_mode)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                if storage_mode == StorageMode::External {
                    self.record_orphan(&pointer, fingerprint, session.address, &e.to_string());
                }
                return Err(LifecycleError::from_ledger(fingerprint, e));
            }
        };

        let credential = self
            .read_back(&handle, fingerprint, session.address, recipient, &pointer, storage_mode)
            .await;

        self.mirror.upsert(TransactionRecord {
            fingerprint,
            tx_hash: receipt.tx_hash,
            issuer: credential.issuer,
            recipient: credential.recipient,
            storage_mode,
            revoked: false,
            updated_at: self.clock.now(),
            stale: false,
        });
        metric_inc!(CREDENTIALS_ISSUED, &[storage_mode.to_string().as_str()]);
        log_credential_event!(
            info,
            SUBSYSTEM,
            "credential issued",
            fingerprint,
            recipient = %recipient,
            tx_hash = %receipt.tx_hash,
            gas_used = receipt.gas_used
        );

        Ok(IssuedCredential {
            credential,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
            total_cost: receipt.total_cost(),
        })
    }

    /// The confirmed record as the ledger reports it. If the read fails right
    /// after confirmation, the submitted values stand in.
    async fn read_back(
        &self,
        handle: &ContractHandle,
        fingerprint: Fingerprint,
        issuer: Address,
        recipient: Address,
        pointer: &[u8],
        storage_mode: StorageMode,
    ) -> OnChainCredential {
        match handle.verify_credential(&fingerprint).await {
            Ok(Some(credential)) => credential,
            other => {
                warn!(%fingerprint, result = ?other.map(|_| ()), "read-back after issue failed");
                OnChainCredential {
                    fingerprint,
                    issuer,
                    recipient,
                    issued_at: self.clock.now(),
                    storage_mode,
                    pointer: pointer.to_vec(),
                    is_revoked: false,
                }
            }
        }
    }

    fn record_orphan(
        &self,
        pointer: &[u8],
        fingerprint: Fingerprint,
        issuer: Address,
        reason: &str,
    ) {
        let pointer = String::from_utf8_lossy(pointer).into_owned();
        warn!(%fingerprint, %pointer, reason, "upload orphaned by failed registration");
        metric_inc!(ORPHANED_UPLOADS);
        self.orphans.record(OrphanedUpload {
            pointer,
            fingerprint,
            issuer,
            recorded_at: self.clock.now(),
            reason: reason.to_string(),
        });
    }

    // =========================================================================
    // REVOKE
    // =========================================================================

    #[instrument(skip(self, session), fields(issuer = %session.address))]
    pub async fn revoke(
        &self,
        session: &Session,
        fingerprint: Fingerprint,
    ) -> Result<RevokedCredential, LifecycleError> {
        let result = self.revoke_inner(session, fingerprint).await;
        if let Err(e) = &result {
            record_failure("revoke", e);
        }
        result
    }

    async fn revoke_inner(
        &self,
        session: &Session,
        fingerprint: Fingerprint,
    ) -> Result<RevokedCredential, LifecycleError> {
        self.require_issuer(session)?;
        let handle = self.adapter.require_handle()?;
        let signer = self.signer(session.address)?;

        let receipt = handle
            .revoke_credential(&signer, &fingerprint)
            .await
            .map_err(|e| LifecycleError::from_ledger(fingerprint, e))?;

        if let Some(mut record) = self.mirror.get(&fingerprint) {
            record.revoked = true;
            record.tx_hash = receipt.tx_hash;
            record.updated_at = self.clock.now();
            self.mirror.upsert(record);
        }
        metric_inc!(CREDENTIALS_REVOKED);
        log_credential_event!(
            info,
            SUBSYSTEM,
            "credential revoked",
            fingerprint,
            tx_hash = %receipt.tx_hash
        );

        Ok(RevokedCredential {
            fingerprint,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Ledger read; no session needed.
    #[instrument(skip(self))]
    pub async fn verify(&self, fingerprint: Fingerprint) -> Result<Verification, LifecycleError> {
        let credential = self.fetch(fingerprint).await?;
        self.reconcile_mirror(&credential);
        Ok(Verification::from(credential))
    }

    /// Content behind a credential, for an Issuer or the credential's
    /// recipient. The bytes must hash back to `fingerprint`.
    #[instrument(skip(self, session), fields(caller = %session.address))]
    pub async fn retrieve_content(
        &self,
        session: &Session,
        fingerprint: Fingerprint,
    ) -> Result<Vec<u8>, LifecycleError> {
        if session.is_expired(self.clock.now()) {
            return Err(LifecycleError::SessionExpired);
        }
        let credential = self.fetch(fingerprint).await?;
        if !session.has_role(Role::Issuer) && session.address != credential.recipient {
            return Err(LifecycleError::PermissionDenied {
                actor: session.address,
                required: Role::Issuer,
            });
        }

        let bytes = match credential.storage_mode {
            StorageMode::Embedded => credential.pointer,
            StorageMode::External => {
                let cid = std::str::from_utf8(&credential.pointer).map_err(|_| {
                    LifecycleError::InvalidRequest("external pointer is not text".into())
                })?;
                self.content.cat(cid).await?
            }
        };

        let actual = fingerprint_of(&bytes);
        if actual != fingerprint {
            warn!(%fingerprint, %actual, "retrieved content does not match fingerprint");
            return Err(LifecycleError::IntegrityMismatch {
                expected: fingerprint,
                actual,
            });
        }
        Ok(bytes)
    }

    async fn fetch(&self, fingerprint: Fingerprint) -> Result<OnChainCredential, LifecycleError> {
        let handle = self.adapter.require_handle()?;
        handle
            .verify_credential(&fingerprint)
            .await?
            .ok_or(LifecycleError::NotFound(fingerprint))
    }

    /// Overwrites a mirror entry that disagrees with the ledger.
    fn reconcile_mirror(&self, credential: &OnChainCredential) {
        let Some(record) = self.mirror.get(&credential.fingerprint) else {
            return;
        };
        if record.agrees_with(credential) {
            return;
        }
        warn!(
            fingerprint = %credential.fingerprint,
            mirror_revoked = record.revoked,
            ledger_revoked = credential.is_revoked,
            "mirror entry stale, overwriting from ledger"
        );
        self.mirror.upsert(TransactionRecord {
            issuer: credential.issuer,
            recipient: credential.recipient,
            storage_mode: credential.storage_mode,
            revoked: credential.is_revoked,
            updated_at: self.clock.now(),
            stale: true,
            ..record
        });
    }

    // =========================================================================
    // CLIENT-SIGNED
    // =========================================================================

    /// Unsigned registration for the session's own wallet to sign.
    pub async fn prepare_issue(
        &self,
        session: &Session,
        fingerprint: Fingerprint,
        recipient: Address,
        pointer: &[u8],
        storage_mode: StorageMode,
    ) -> Result<PreparedIssue, LifecycleError> {
        self.require_issuer(session)?;
        if recipient.is_zero() || pointer.is_empty() {
            return Err(LifecycleError::InvalidRequest(
                "recipient and pointer are required".into(),
            ));
        }
        if storage_mode == StorageMode::Embedded {
            self.check_embedded_size(pointer.len())?;
        }
        let handle = self.adapter.require_handle()?;
        let transaction = handle
            .prepare_register(session.address, &fingerprint, recipient, pointer, storage_mode)
            .await?;
        Ok(PreparedIssue {
            fingerprint,
            transaction,
        })
    }

    pub async fn prepare_revoke(
        &self,
        session: &Session,
        fingerprint: Fingerprint,
    ) -> Result<UnsignedTransaction, LifecycleError> {
        self.require_issuer(session)?;
        let handle = self.adapter.require_handle()?;
        Ok(handle.prepare_revoke(session.address, &fingerprint).await?)
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    pub fn orphaned_uploads(&self) -> Vec<OrphanedUpload> {
        self.orphans.list()
    }

    pub fn mirror_record(&self, fingerprint: &Fingerprint) -> Option<TransactionRecord> {
        self.mirror.get(fingerprint)
    }

    pub fn content_store(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    // =========================================================================
    // GATES
    // =========================================================================

    fn require_issuer(&self, session: &Session) -> Result<(), LifecycleError> {
        if session.is_expired(self.clock.now()) {
            return Err(LifecycleError::SessionExpired);
        }
        if !session.has_role(Role::Issuer) {
            return Err(LifecycleError::PermissionDenied {
                actor: session.address,
                required: Role::Issuer,
            });
        }
        Ok(())
    }

    fn check_embedded_size(&self, size: usize) -> Result<(), LifecycleError> {
        if size > self.config.embedded_limit_bytes {
            return Err(LifecycleError::PayloadTooLarge {
                size,
                limit: self.config.embedded_limit_bytes,
            });
        }
        Ok(())
    }

    fn signer(&self, address: Address) -> Result<Arc<SigningAccount>, LifecycleError> {
        self.signers
            .signer_for(&address)
            .ok_or(LifecycleError::SignerUnavailable(address))
    }
}

fn record_failure(operation: &str, e: &LifecycleError) {
    let kind = format!("{:?}", e.kind());
    metric_inc!(LIFECYCLE_FAILURES, &[operation, kind.as_str()]);
    warn!(operation, error = %e, "credential operation failed");
}
