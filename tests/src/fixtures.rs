//! # Test World
//!
//! Every credential service wired over one in-memory ledger and one manual
//! clock, the way the runtime container wires them over a live node.

use std::sync::Arc;
use std::time::Duration;

use cl_01_ledger_adapter::adapters::{InMemoryConnector, InMemoryLedger};
use cl_01_ledger_adapter::{AdapterConfig, LedgerAdapter, SubmitConfig};
use cl_02_access_control::AccessControlService;
use cl_03_identity_binding::{IdentityConfig, IdentityService, InMemoryIdentityStore, Login};
use cl_04_credential_lifecycle::{
    CredentialService, InMemoryContentStore, InMemoryMirror, LifecycleConfig,
};
use cl_05_audit_projection::{AuditConfig, AuditService};
use primitive_types::U256;
use shared_crypto::{Keyring, SigningAccount};
use shared_types::{Address, ManualClock, Role, TimeSource};

pub const GENESIS_TIME: u64 = 1_700_000_000;

pub struct World {
    pub clock: Arc<ManualClock>,
    pub keyring: Arc<Keyring>,
    pub ledger: Arc<InMemoryLedger>,
    pub adapter: Arc<LedgerAdapter>,
    pub content: Arc<InMemoryContentStore>,
    pub mirror: Arc<InMemoryMirror>,
    pub access: Arc<AccessControlService>,
    pub identity: Arc<IdentityService>,
    pub credentials: Arc<CredentialService>,
    pub audit: Arc<AuditService>,
    /// Holds Admin at genesis.
    pub admin: Address,
    /// Holds Issuer at genesis, funded.
    pub issuer: Address,
}

impl World {
    pub async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(GENESIS_TIME));
        let time: Arc<dyn TimeSource> = clock.clone();
        let keyring = Arc::new(Keyring::new());
        let admin = keyring.insert(SigningAccount::generate());
        let issuer = keyring.insert(SigningAccount::generate());

        let ledger = Arc::new(InMemoryLedger::new(admin, time.clone()));
        ledger.grant_genesis_role(Role::Issuer, issuer);
        ledger.fund(issuer, U256::exp10(22));

        let adapter = Arc::new(LedgerAdapter::new(
            adapter_config(),
            Arc::new(InMemoryConnector::new(ledger.clone())),
            Arc::new(ledger.artifacts()),
        ));
        adapter.refresh().await;

        let content = Arc::new(InMemoryContentStore::new());
        let mirror = Arc::new(InMemoryMirror::new());
        let access = Arc::new(AccessControlService::new(
            adapter.clone(),
            keyring.clone(),
            time.clone(),
        ));
        let identity = Arc::new(
            IdentityService::new(
                IdentityConfig {
                    session_secret: vec![0x5e; 32],
                    ..IdentityConfig::default()
                },
                access.clone(),
                Arc::new(InMemoryIdentityStore::new()),
                time.clone(),
            )
            .expect("identity service"),
        );
        let credentials = Arc::new(CredentialService::new(
            LifecycleConfig::default(),
            adapter.clone(),
            keyring.clone(),
            content.clone(),
            mirror.clone(),
            time.clone(),
        ));
        let audit = Arc::new(AuditService::new(
            AuditConfig {
                signer: Some(issuer),
                ..AuditConfig::default()
            },
            adapter.clone(),
            content.clone(),
        ));

        Self {
            clock,
            keyring,
            ledger,
            adapter,
            content,
            mirror,
            access,
            identity,
            credentials,
            audit,
            admin,
            issuer,
        }
    }

    pub fn account(&self, address: Address) -> Arc<SigningAccount> {
        self.keyring.get(&address).expect("account in keyring")
    }

    /// Full challenge-response login for `account`.
    pub async fn login(&self, account: &SigningAccount) -> Login {
        let address = account.address().to_checksum();
        let challenge = self.identity.get_challenge(&address).unwrap();
        let signature = account
            .sign_personal_message(challenge.nonce.as_bytes())
            .unwrap();
        self.identity
            .verify(&address, &signature.to_hex())
            .await
            .unwrap()
    }

    pub async fn login_as(&self, address: Address) -> Login {
        self.login(&self.account(address)).await
    }
}

pub fn adapter_config() -> AdapterConfig {
    AdapterConfig {
        endpoint: "memory://".into(),
        submit: SubmitConfig {
            receipt_poll_interval: Duration::from_millis(1),
            ..SubmitConfig::default()
        },
    }
}
