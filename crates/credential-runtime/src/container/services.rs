//! # Service Container
//!
//! Builds every subsystem from a [`RuntimeConfig`] and holds them for the
//! lifetime of the process.
//!
//! ## Thread Safety
//!
//! - every service is wrapped in `Arc` for shared ownership
//! - services hold their own interior locks; the container itself is immutable

use std::sync::Arc;

use cl_01_ledger_adapter::adapters::{
    FsArtifactSource, HttpConnector, InMemoryConnector, InMemoryLedger,
};
use cl_01_ledger_adapter::{ArtifactSource, LedgerAdapter, RpcConnector};
use cl_02_access_control::AccessControlService;
use cl_03_identity_binding::{IdentityError, IdentityService, InMemoryIdentityStore};
use cl_04_credential_lifecycle::{
    ContentStore, ContentStoreError, CredentialService, InMemoryContentStore, InMemoryMirror,
    IpfsContentStore,
};
use cl_05_audit_projection::AuditService;
use primitive_types::U256;
use shared_crypto::{CryptoError, Keyring, SigningAccount};
use shared_types::{Role, SystemTimeSource, TimeSource};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::container::config::{ConfigError, RuntimeConfig};

/// Balance given to each configured signer on the development ledger.
const DEV_SIGNER_FUNDS_WEI: u64 = 1_000_000_000_000_000_000;

/// Failures while wiring the container.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("signing keys: {0}")]
    Keys(#[from] CryptoError),

    #[error("identity service: {0}")]
    Identity(#[from] IdentityError),

    #[error("content store: {0}")]
    ContentStore(#[from] ContentStoreError),
}

/// Central container holding all subsystem instances.
pub struct ServiceContainer {
    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    pub clock: Arc<dyn TimeSource>,
    pub keyring: Arc<Keyring>,
    pub content: Arc<dyn ContentStore>,

    // =========================================================================
    // SUBSYSTEMS
    // =========================================================================
    /// Ledger Adapter (cl-01).
    pub adapter: Arc<LedgerAdapter>,
    /// Access Control (cl-02).
    pub access: Arc<AccessControlService>,
    /// Identity Binding (cl-03).
    pub identity: Arc<IdentityService>,
    /// Credential Lifecycle (cl-04).
    pub credentials: Arc<CredentialService>,
    /// Audit Projection (cl-05).
    pub audit: Arc<AuditService>,

    /// Present only in development mode.
    pub dev_ledger: Option<Arc<InMemoryLedger>>,

    /// Configuration (immutable after initialization).
    pub config: RuntimeConfig,
}

impl ServiceContainer {
    /// Wire against a real ledger node and IPFS API. Artifacts are read from
    /// `CL_ARTIFACT_DIR`; a missing artifact leaves the adapter unbound rather
    /// than failing startup.
    #[instrument(name = "container_init", skip(config))]
    pub async fn connect(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        info!("Initializing credential service container");

        let keyring = Arc::new(load_keyring(&config)?);
        let content: Arc<dyn ContentStore> =
            Arc::new(IpfsContentStore::new(config.content_store.api_url.clone())?);
        let artifacts: Arc<dyn ArtifactSource> = Arc::new(FsArtifactSource::new(
            config.ledger.artifact_dir.clone(),
            config.ledger.contract_name.clone(),
        ));

        Self::assemble(
            config,
            Arc::new(SystemTimeSource),
            keyring,
            Arc::new(HttpConnector),
            artifacts,
            content,
            None,
        )
        .await
    }

    /// Wire against an in-memory ledger and content store. A fresh admin
    /// account holding every role is generated; configured signer keys are
    /// funded and granted the Issuer role.
    #[instrument(name = "container_init_dev", skip(config))]
    pub async fn in_memory(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        warn!("Development mode: in-memory ledger, state is lost on exit");

        let keyring = Arc::new(load_keyring(&config)?);
        let configured = keyring.addresses();
        let admin = keyring.insert(SigningAccount::generate());

        let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let ledger = Arc::new(InMemoryLedger::new(admin, clock.clone()));
        ledger.grant_genesis_role(Role::Issuer, admin);
        for address in configured {
            ledger.fund(address, U256::from(DEV_SIGNER_FUNDS_WEI));
            ledger.grant_genesis_role(Role::Issuer, address);
        }

        let artifacts: Arc<dyn ArtifactSource> = Arc::new(ledger.artifacts());
        Self::assemble(
            config,
            clock,
            keyring,
            Arc::new(InMemoryConnector::new(ledger.clone())),
            artifacts,
            Arc::new(InMemoryContentStore::new()),
            Some(ledger),
        )
        .await
    }

    async fn assemble(
        config: RuntimeConfig,
        clock: Arc<dyn TimeSource>,
        keyring: Arc<Keyring>,
        connector: Arc<dyn RpcConnector>,
        artifacts: Arc<dyn ArtifactSource>,
        content: Arc<dyn ContentStore>,
        dev_ledger: Option<Arc<InMemoryLedger>>,
    ) -> Result<Self, RuntimeError> {
        // =====================================================================
        // LEVEL 1: Ledger Adapter
        // =====================================================================
        let adapter = Arc::new(LedgerAdapter::new(
            config.adapter_config(),
            connector,
            artifacts,
        ));
        let status = adapter.refresh().await;
        if status.bound {
            info!(program = ?status.program_address, "  [cl-01] Ledger adapter bound");
        } else {
            warn!(error = ?status.last_error, "  [cl-01] Ledger adapter not bound");
        }

        // =====================================================================
        // LEVEL 2: Access Control
        // =====================================================================
        let access = Arc::new(AccessControlService::new(
            adapter.clone(),
            keyring.clone(),
            clock.clone(),
        ));
        info!("  [cl-02] Access control initialized");

        // =====================================================================
        // LEVEL 3: Identity, Lifecycle, Audit
        // =====================================================================
        let identity = Arc::new(IdentityService::new(
            config.identity_config(),
            access.clone(),
            Arc::new(InMemoryIdentityStore::new()),
            clock.clone(),
        )?);
        info!("  [cl-03] Identity binding initialized");

        let credentials = Arc::new(CredentialService::new(
            config.lifecycle_config(),
            adapter.clone(),
            keyring.clone(),
            content.clone(),
            Arc::new(InMemoryMirror::new()),
            clock.clone(),
        ));
        info!("  [cl-04] Credential lifecycle initialized");

        let audit = Arc::new(AuditService::new(
            config
                .audit
                .to_audit_config(keyring.addresses().into_iter().next()),
            adapter.clone(),
            content.clone(),
        ));
        info!("  [cl-05] Audit projection initialized");

        Ok(Self {
            clock,
            keyring,
            content,
            adapter,
            access,
            identity,
            credentials,
            audit,
            dev_ledger,
            config,
        })
    }
}

fn load_keyring(config: &RuntimeConfig) -> Result<Keyring, CryptoError> {
    let keys: Vec<&str> = config.signing.keys.iter().map(|k| k.as_str()).collect();
    Keyring::from_hex_keys(&keys)
}
