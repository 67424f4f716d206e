//! # Adapter Flow
//!
//! Deployment artifacts that appear after the process started.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cl_01_ledger_adapter::adapters::{FsArtifactSource, InMemoryConnector, InMemoryLedger};
    use cl_01_ledger_adapter::LedgerAdapter;
    use cl_02_access_control::AccessControlService;
    use shared_crypto::{Keyring, SigningAccount};
    use shared_types::{Classify, ErrorKind, ManualClock, RoleStatus, TimeSource};

    use crate::fixtures::{adapter_config, GENESIS_TIME};

    /// Started before the program was deployed: no handle, roles unknown.
    /// Once the artifacts are written, `refresh()` binds.
    #[tokio::test]
    async fn test_refresh_binds_after_artifacts_appear() {
        let dir = tempfile::tempdir().unwrap();
        let clock: Arc<dyn TimeSource> = Arc::new(ManualClock::new(GENESIS_TIME));
        let keyring = Arc::new(Keyring::new());
        let admin = keyring.insert(SigningAccount::generate());
        let ledger = Arc::new(InMemoryLedger::new(admin, clock.clone()));

        let artifacts = FsArtifactSource::new(dir.path(), "CredentialRegistry");
        let adapter = Arc::new(LedgerAdapter::new(
            adapter_config(),
            Arc::new(InMemoryConnector::new(ledger.clone())),
            Arc::new(artifacts.clone()),
        ));
        let access = AccessControlService::new(adapter.clone(), keyring.clone(), clock);

        let status = adapter.refresh().await;
        assert!(status.connected && !status.bound);
        assert!(adapter.get_handle().is_none());
        assert_eq!(
            adapter.require_handle().unwrap_err().kind(),
            ErrorKind::ConfigurationError
        );
        assert!(access.check_roles(admin).await.is_fully_unknown());

        std::fs::write(artifacts.interface_path(), ledger.interface_document()).unwrap();
        std::fs::write(
            artifacts.address_path(),
            format!("{}\n", ledger.contract_address().to_checksum()),
        )
        .unwrap();

        let status = adapter.refresh().await;
        assert!(status.bound);
        assert_eq!(status.program_address, Some(ledger.contract_address()));
        assert!(adapter.get_handle().is_some());
        assert_eq!(access.check_roles(admin).await.admin, RoleStatus::Present);
    }

    #[tokio::test]
    async fn test_malformed_address_marker_stays_unbound() {
        let dir = tempfile::tempdir().unwrap();
        let clock: Arc<dyn TimeSource> = Arc::new(ManualClock::new(GENESIS_TIME));
        let ledger = Arc::new(InMemoryLedger::new(
            SigningAccount::generate().address(),
            clock,
        ));
        let artifacts = FsArtifactSource::new(dir.path(), "CredentialRegistry");
        std::fs::write(artifacts.interface_path(), ledger.interface_document()).unwrap();
        std::fs::write(artifacts.address_path(), "not-an-address").unwrap();

        let adapter = LedgerAdapter::new(
            adapter_config(),
            Arc::new(InMemoryConnector::new(ledger)),
            Arc::new(artifacts),
        );
        let status = adapter.refresh().await;
        assert!(!status.bound);
        assert!(status.last_error.is_some());
        assert!(adapter.get_handle().is_none());
    }
}
