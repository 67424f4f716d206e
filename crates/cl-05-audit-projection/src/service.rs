//! # Audit Service
//!
//! Dashboards and credential listings read the projection after a catch-up.
//! `replay_full` bypasses the projection and rebuilds from genesis.

use cl_01_ledger_adapter::LedgerAdapter;
use cl_04_credential_lifecycle::ContentStore;
use shared_types::Address;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::domain::{AuditError, AuditReport, CredentialSummary, Dashboard};
use crate::projection::{AuditProjection, CatchUp};
use crate::replay;

/// Default size of the recent-registrations window.
pub const DEFAULT_RECENT_WINDOW: usize = 8;

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub recent_window: usize,
    /// Account whose balance the dashboard reports.
    pub signer: Option<Address>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            signer: None,
        }
    }
}

pub struct AuditService {
    config: AuditConfig,
    adapter: Arc<LedgerAdapter>,
    content: Arc<dyn ContentStore>,
    projection: AuditProjection,
}

impl AuditService {
    pub fn new(
        config: AuditConfig,
        adapter: Arc<LedgerAdapter>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            config,
            adapter,
            content,
            projection: AuditProjection::new(),
        }
    }

    pub async fn replay_full(&self) -> Result<AuditReport, AuditError> {
        let handle = self.adapter.require_handle()?;
        replay::replay_full(&handle, self.config.recent_window).await
    }

    pub async fn catch_up(&self) -> Result<CatchUp, AuditError> {
        let handle = self.adapter.require_handle()?;
        self.projection.catch_up(&handle).await
    }

    /// Report from the projection after catching up.
    pub async fn report(&self) -> Result<AuditReport, AuditError> {
        self.catch_up().await?;
        Ok(self.projection.report(self.config.recent_window))
    }

    /// Never fails. If the projection cannot catch up, the dashboard shows
    /// what is already indexed and is marked lagging.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Dashboard {
        let lagging = match self.catch_up().await {
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "dashboard built from a lagging projection");
                true
            }
        };
        let report = self.projection.report(self.config.recent_window);

        let (ledger_node, content_store, signer_balance) = tokio::join!(
            self.adapter.health(),
            self.content.status(),
            self.signer_balance(),
        );

        Dashboard {
            active: report.totals.issued.saturating_sub(report.totals.revoked),
            recent: report.recent,
            totals: report.totals,
            signer: self.config.signer,
            signer_balance,
            ledger_node,
            content_store,
            indexed_height: self.projection.height(),
            lagging,
        }
    }

    async fn signer_balance(&self) -> Option<primitive_types::U256> {
        let signer = self.config.signer?;
        let handle = self.adapter.get_handle()?;
        match handle.balance(signer).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(%signer, error = %e, "signer balance unavailable");
                None
            }
        }
    }

    pub async fn list_credentials(&self) -> Result<Vec<CredentialSummary>, AuditError> {
        self.catch_up().await?;
        Ok(self.projection.list_credentials())
    }

    /// A student's own credentials.
    pub async fn credentials_for_recipient(
        &self,
        recipient: Address,
    ) -> Result<Vec<CredentialSummary>, AuditError> {
        self.catch_up().await?;
        Ok(self.projection.credentials_for_recipient(recipient))
    }

    pub fn projection(&self) -> &AuditProjection {
        &self.projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuditEventKind;
    use cl_01_ledger_adapter::adapters::{InMemoryConnector, InMemoryLedger};
    use cl_01_ledger_adapter::{AdapterConfig, SubmitConfig};
    use cl_04_credential_lifecycle::{fingerprint_of, InMemoryContentStore};
    use shared_crypto::{Keyring, SigningAccount};
    use shared_types::{Fingerprint, ManualClock, Role, StorageMode, TimeSource};
    use std::time::Duration;

    const STUDENT: Address = Address([0x51; 20]);

    struct Fixture {
        ledger: Arc<InMemoryLedger>,
        adapter: Arc<LedgerAdapter>,
        signer: Arc<SigningAccount>,
        content: Arc<InMemoryContentStore>,
        service: AuditService,
    }

    type LedgerCtor = fn(Address, Arc<dyn TimeSource>) -> InMemoryLedger;

    async fn fixture_with(ledger_ctor: LedgerCtor) -> Fixture {
        let clock: Arc<dyn TimeSource> = Arc::new(ManualClock::new(1_700_000_000));
        let keyring = Keyring::new();
        let admin = keyring.insert(SigningAccount::generate());
        let ledger = Arc::new(ledger_ctor(admin, clock));
        ledger.grant_genesis_role(Role::Issuer, admin);

        let adapter = Arc::new(LedgerAdapter::new(
            AdapterConfig {
                endpoint: "memory://".into(),
                submit: SubmitConfig {
                    receipt_poll_interval: Duration::from_millis(1),
                    ..SubmitConfig::default()
                },
            },
            Arc::new(InMemoryConnector::new(ledger.clone())),
            Arc::new(ledger.artifacts()),
        ));
        adapter.refresh().await;

        let content = Arc::new(InMemoryContentStore::new());
        let service = AuditService::new(
            AuditConfig {
                recent_window: 2,
                signer: Some(admin),
            },
            adapter.clone(),
            content.clone(),
        );
        Fixture {
            signer: keyring.get(&admin).unwrap(),
            ledger,
            adapter,
            content,
            service,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(InMemoryLedger::new).await
    }

    async fn register(
        f: &Fixture,
        content: &[u8],
        pointer: &[u8],
        mode: StorageMode,
    ) -> Fingerprint {
        let fp = fingerprint_of(content);
        f.adapter
            .require_handle()
            .unwrap()
            .register_credential(&f.signer, &fp, STUDENT, pointer, mode)
            .await
            .unwrap();
        fp
    }

    async fn revoke(f: &Fixture, fp: Fingerprint) {
        f.adapter
            .require_handle()
            .unwrap()
            .revoke_credential(&f.signer, &fp)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_replay_full_sorted_and_totalled() {
        let f = fixture().await;
        let a = register(&f, b"a", b"a", StorageMode::Embedded).await;
        let cid = InMemoryContentStore::content_id(b"b");
        register(&f, b"b", cid.as_bytes(), StorageMode::External).await;
        register(&f, b"c", b"c", StorageMode::Embedded).await;
        revoke(&f, a).await;

        let report = f.service.replay_full().await.unwrap();
        assert_eq!(report.totals.issued, 3);
        assert_eq!(report.totals.revoked, 1);
        assert_eq!(report.totals.recent, 2);
        assert_eq!(report.totals.external, 1);
        assert_eq!(report.totals.embedded, 2);
        assert!(report.totals.cumulative_gas > 0);
        assert!(report
            .registered
            .windows(2)
            .all(|w| w[0].block_number >= w[1].block_number));
        assert!(report.registered.iter().all(|e| e.timestamp.is_some()));
        assert_eq!(report.revoked[0].kind, AuditEventKind::Revoked);
    }

    /// An embedded document that happens to look like a content identifier
    /// keeps the mode it was registered with.
    #[tokio::test]
    async fn test_storage_mode_read_from_ledger() {
        let f = fixture().await;
        let look_alike = b"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG-transcript";
        let fp = register(&f, look_alike, look_alike, StorageMode::Embedded).await;

        let report = f.service.replay_full().await.unwrap();
        assert_eq!(report.totals.embedded, 1);
        assert_eq!(report.totals.external, 0);
        assert_eq!(report.registered[0].storage_mode, Some(StorageMode::Embedded));

        let summary = f.service.list_credentials().await.unwrap();
        assert_eq!(summary[0].fingerprint, fp);
        assert_eq!(summary[0].storage_mode, StorageMode::Embedded);
    }

    #[tokio::test]
    async fn test_recent_window_includes_revocations() {
        let f = fixture().await;
        let a = register(&f, b"a", b"a", StorageMode::Embedded).await;
        register(&f, b"b", b"b", StorageMode::Embedded).await;
        revoke(&f, a).await;

        let dash = f.service.dashboard().await;
        assert_eq!(dash.recent.len(), 2);
        assert_eq!(dash.recent[0].kind, AuditEventKind::Revoked);
        assert_eq!(dash.recent[0].fingerprint, a);
        assert_eq!(dash.recent[1].kind, AuditEventKind::Registered);
        assert_eq!(dash.recent[1].fingerprint, fingerprint_of(b"b"));
    }

    #[tokio::test]
    async fn test_projection_matches_full_replay() {
        let f = fixture().await;
        let a = register(&f, b"a", b"a", StorageMode::Embedded).await;
        f.service.catch_up().await.unwrap();

        register(&f, b"b", b"b", StorageMode::Embedded).await;
        revoke(&f, a).await;
        let step = f.service.catch_up().await.unwrap();
        assert_eq!(step.new_events, 2);

        let projected = f.service.report().await.unwrap();
        let replayed = f.service.replay_full().await.unwrap();
        assert_eq!(projected, replayed);

        let again = f.service.catch_up().await.unwrap();
        assert_eq!(again.new_events, 0);
    }

    #[tokio::test]
    async fn test_failed_enrichment_reads_leave_none() {
        let f = fixture().await;
        register(&f, b"a", b"a", StorageMode::Embedded).await;
        f.ledger.set_blocks_unavailable(true);
        f.ledger.set_receipts_unavailable(true);

        let report = f.service.replay_full().await.unwrap();
        assert_eq!(report.totals.issued, 1);
        assert_eq!(report.registered[0].timestamp, None);
        assert_eq!(report.registered[0].gas_used, None);
        assert_eq!(report.totals.cumulative_gas, 0);
    }

    #[tokio::test]
    async fn test_legacy_program_has_no_revocation_list() {
        let f = fixture_with(InMemoryLedger::legacy).await;
        let a = register(&f, b"a", b"a", StorageMode::Embedded).await;
        revoke(&f, a).await;

        let report = f.service.replay_full().await.unwrap();
        assert!(!report.revocations_tracked);
        assert!(report.revoked.is_empty());
        assert_eq!(report.totals.issued, 1);
    }

    #[tokio::test]
    async fn test_listings_by_recipient() {
        let f = fixture().await;
        let a = register(&f, b"a", b"a", StorageMode::Embedded).await;
        register(&f, b"b", b"b", StorageMode::Embedded).await;
        revoke(&f, a).await;

        let all = f.service.list_credentials().await.unwrap();
        assert_eq!(all.len(), 2);
        let mine = f.service.credentials_for_recipient(STUDENT).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().any(|c| c.fingerprint == a && c.revoked));
        assert!(f
            .service
            .credentials_for_recipient(Address([1; 20]))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_reports_statuses() {
        let f = fixture().await;
        register(&f, b"a", b"a", StorageMode::Embedded).await;

        let dash = f.service.dashboard().await;
        assert!(!dash.lagging);
        assert_eq!(dash.totals.issued, 1);
        assert_eq!(dash.active, 1);
        assert!(dash.ledger_node.is_online());
        assert!(dash.content_store.is_online());
        assert!(dash.signer_balance.is_some());

        f.content.set_offline(true);
        f.ledger.set_offline(true);
        let dash = f.service.dashboard().await;
        assert!(dash.lagging);
        assert_eq!(dash.totals.issued, 1);
        assert!(!dash.ledger_node.is_online());
        assert!(!dash.content_store.is_online());
    }
}
