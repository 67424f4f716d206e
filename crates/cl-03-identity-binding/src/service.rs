//! # Identity Binding Service
//!
//! ```text
//! NoChallenge --get_challenge--> Issued --verify(match)--> Verified
//!                                   |
//!                                   +--ttl elapsed--> Expired
//! ```
//!
//! A mismatched signature leaves the challenge in `Issued`.

use serde::Serialize;
use shared_crypto::{recover_personal_signer, RecoverableSignature};
use shared_types::{Address, Session, TimeSource};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use credential_telemetry::{AUTH_ATTEMPTS, CHALLENGES_ISSUED};

use crate::domain::{
    generate_nonce, Challenge, ChallengeStore, Identity, IdentityError, SessionCodec,
    DEFAULT_CHALLENGE_TTL_SECS,
};
use crate::ports::{IdentityStore, RoleResolver};

pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

#[derive(Clone)]
pub struct IdentityConfig {
    pub challenge_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub session_secret: Vec<u8>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            challenge_ttl_secs: DEFAULT_CHALLENGE_TTL_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            // Development only; production config rejects an all-zero secret.
            session_secret: vec![0u8; 32],
        }
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_secret", &"<redacted>")
            .finish()
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, Serialize)]
pub struct Login {
    pub token: String,
    pub session: Session,
    pub identity: Identity,
}

pub struct IdentityService {
    config: IdentityConfig,
    challenges: ChallengeStore,
    codec: SessionCodec,
    roles: Arc<dyn RoleResolver>,
    identities: Arc<dyn IdentityStore>,
    clock: Arc<dyn TimeSource>,
}

impl IdentityService {
    pub fn new(
        config: IdentityConfig,
        roles: Arc<dyn RoleResolver>,
        identities: Arc<dyn IdentityStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, IdentityError> {
        let codec = SessionCodec::new(&config.session_secret)?;
        Ok(Self {
            config,
            challenges: ChallengeStore::new(),
            codec,
            roles,
            identities,
            clock,
        })
    }

    #[instrument(skip(self))]
    pub fn get_challenge(&self, address: &str) -> Result<Challenge, IdentityError> {
        let address = parse_address(address)?;
        let challenge = self.challenges.issue(
            address,
            generate_nonce(),
            self.clock.now(),
            self.config.challenge_ttl_secs,
        );
        CHALLENGES_ISSUED.inc();
        debug!(%address, "challenge issued");
        Ok(challenge)
    }

    /// Proves control of `address` by a personal-message signature over the
    /// outstanding nonce, then mints a session.
    #[instrument(skip(self, signature))]
    pub async fn verify(&self, address: &str, signature: &str) -> Result<Login, IdentityError> {
        let result = self.verify_inner(address, signature).await;
        match &result {
            Ok(login) => {
                AUTH_ATTEMPTS.with_label_values(&["success"]).inc();
                info!(
                    address = %login.session.address,
                    roles = ?login.session.roles,
                    "login verified"
                );
            }
            Err(e) => {
                AUTH_ATTEMPTS.with_label_values(&[e.outcome_label()]).inc();
                warn!(error = %e, "login rejected");
            }
        }
        result
    }

    async fn verify_inner(&self, address: &str, signature: &str) -> Result<Login, IdentityError> {
        let address = parse_address(address)?;
        let now = self.clock.now();

        let challenge = self
            .challenges
            .live(&address, now)
            .ok_or(IdentityError::ChallengeExpired(address))?;

        let signature = parse_signature(signature)?;
        let recovered = recover_personal_signer(challenge.nonce.as_bytes(), &signature)
            .map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;
        if recovered != address {
            return Err(IdentityError::SignatureMismatch {
                expected: address,
                recovered,
            });
        }

        // A concurrent verify may have taken it between the read and here.
        if !self.challenges.consume(&address, &challenge.nonce, now) {
            return Err(IdentityError::ChallengeExpired(address));
        }

        let snapshot = self.roles.resolve(address).await;
        if snapshot.is_fully_unknown() {
            return Err(IdentityError::RolesUnavailable(address));
        }
        let roles = snapshot.effective_roles();

        let identity = self.identities.upsert(address, roles.clone(), now);
        let session = Session::new(address, roles, now, self.config.session_ttl_secs);
        let token = self.codec.encode(&session)?;

        Ok(Login {
            token,
            session,
            identity,
        })
    }

    /// Validates a bearer token minted by [`verify`](Self::verify).
    pub fn authenticate(&self, token: &str) -> Result<Session, IdentityError> {
        self.codec.decode(token, self.clock.now())
    }

    pub fn identity(&self, address: &Address) -> Option<Identity> {
        self.identities.get(address)
    }

    /// Outstanding challenges, live or awaiting the next sweep.
    pub fn pending_challenges(&self) -> usize {
        self.challenges.len()
    }
}

fn parse_address(input: &str) -> Result<Address, IdentityError> {
    Address::from_str(input.trim()).map_err(|e| IdentityError::InvalidAddress(e.to_string()))
}

fn parse_signature(input: &str) -> Result<RecoverableSignature, IdentityError> {
    let trimmed = input.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes =
        hex::decode(hex_part).map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;
    RecoverableSignature::from_bytes(&bytes)
        .map_err(|e| IdentityError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryIdentityStore;
    use async_trait::async_trait;
    use shared_crypto::SigningAccount;
    use shared_types::{Classify, ErrorKind, ManualClock, Role, RoleSnapshot, RoleStatus};
    use std::collections::BTreeSet;

    struct FixedRoles(RoleSnapshot);

    #[async_trait]
    impl RoleResolver for FixedRoles {
        async fn resolve(&self, _address: Address) -> RoleSnapshot {
            self.0.clone()
        }
    }

    fn service(snapshot: RoleSnapshot) -> (IdentityService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let service = IdentityService::new(
            IdentityConfig {
                session_secret: vec![5u8; 32],
                ..IdentityConfig::default()
            },
            Arc::new(FixedRoles(snapshot)),
            Arc::new(InMemoryIdentityStore::new()),
            clock.clone(),
        )
        .unwrap();
        (service, clock)
    }

    fn sign(account: &SigningAccount, nonce: &str) -> String {
        account
            .sign_personal_message(nonce.as_bytes())
            .unwrap()
            .to_hex()
    }

    // =========================================================================
    // Challenge / verify
    // =========================================================================

    #[tokio::test]
    async fn test_verify_succeeds_exactly_once() {
        let (svc, _) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        let account = SigningAccount::generate();
        let address = account.address().to_checksum();

        let challenge = svc.get_challenge(&address).unwrap();
        let signature = sign(&account, &challenge.nonce);

        let login = svc.verify(&address, &signature).await.unwrap();
        assert_eq!(login.session.address, account.address());

        let err = svc.verify(&address, &signature).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChallengeExpired);
    }

    #[tokio::test]
    async fn test_address_case_is_ignored() {
        let (svc, _) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        let account = SigningAccount::generate();

        let upper = format!("0x{}", hex::encode_upper(account.address().0));
        let challenge = svc.get_challenge(&upper).unwrap();
        let signature = sign(&account, &challenge.nonce);
        assert!(svc
            .verify(&account.address().to_checksum(), &signature)
            .await
            .is_ok());
    }

    /// A wrong signer must not burn the legitimate owner's challenge.
    #[tokio::test]
    async fn test_mismatch_keeps_challenge() {
        let (svc, _) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        let owner = SigningAccount::generate();
        let intruder = SigningAccount::generate();
        let address = owner.address().to_lower_hex();

        let challenge = svc.get_challenge(&address).unwrap();
        let err = svc
            .verify(&address, &sign(&intruder, &challenge.nonce))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureMismatch);

        assert!(svc
            .verify(&address, &sign(&owner, &challenge.nonce))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_challenges_do_not_accumulate() {
        let (svc, clock) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        for i in 1..=50u8 {
            svc.get_challenge(&Address([i; 20]).to_lower_hex()).unwrap();
        }
        assert_eq!(svc.pending_challenges(), 50);

        clock.advance(DEFAULT_CHALLENGE_TTL_SECS);
        svc.get_challenge(&Address([0xee; 20]).to_lower_hex()).unwrap();
        assert_eq!(svc.pending_challenges(), 1);
    }

    #[tokio::test]
    async fn test_expired_challenge() {
        let (svc, clock) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        let account = SigningAccount::generate();
        let address = account.address().to_lower_hex();

        let challenge = svc.get_challenge(&address).unwrap();
        clock.advance(DEFAULT_CHALLENGE_TTL_SECS);
        let err = svc
            .verify(&address, &sign(&account, &challenge.nonce))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChallengeExpired);
    }

    #[tokio::test]
    async fn test_malformed_inputs_are_invalid_requests() {
        let (svc, _) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        assert_eq!(
            svc.get_challenge("0x1234").unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );

        let account = SigningAccount::generate();
        let address = account.address().to_lower_hex();
        svc.get_challenge(&address).unwrap();
        let err = svc.verify(&address, "0xdeadbeef").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    // =========================================================================
    // Roles in the session
    // =========================================================================

    #[tokio::test]
    async fn test_no_roles_defaults_to_student() {
        let (svc, _) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        let account = SigningAccount::generate();
        let address = account.address().to_lower_hex();
        let challenge = svc.get_challenge(&address).unwrap();

        let login = svc
            .verify(&address, &sign(&account, &challenge.nonce))
            .await
            .unwrap();
        assert_eq!(login.session.roles, BTreeSet::from([Role::Student]));
    }

    #[tokio::test]
    async fn test_unknown_roles_are_not_granted() {
        let mut snapshot = RoleSnapshot::uniform(RoleStatus::Unknown);
        snapshot.set(Role::Issuer, RoleStatus::Present);
        let (svc, _) = service(snapshot);
        let account = SigningAccount::generate();
        let address = account.address().to_lower_hex();
        let challenge = svc.get_challenge(&address).unwrap();

        let login = svc
            .verify(&address, &sign(&account, &challenge.nonce))
            .await
            .unwrap();
        assert_eq!(login.session.roles, BTreeSet::from([Role::Issuer]));
    }

    #[tokio::test]
    async fn test_all_unknown_is_connection_error() {
        let (svc, _) = service(RoleSnapshot::uniform(RoleStatus::Unknown));
        let account = SigningAccount::generate();
        let address = account.address().to_lower_hex();
        let challenge = svc.get_challenge(&address).unwrap();

        let err = svc
            .verify(&address, &sign(&account, &challenge.nonce))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
        assert!(svc.identity(&account.address()).is_none());
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    #[tokio::test]
    async fn test_authenticate_round_and_expiry() {
        let (svc, clock) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        let account = SigningAccount::generate();
        let address = account.address().to_lower_hex();
        let challenge = svc.get_challenge(&address).unwrap();
        let login = svc
            .verify(&address, &sign(&account, &challenge.nonce))
            .await
            .unwrap();

        assert_eq!(svc.authenticate(&login.token).unwrap(), login.session);
        assert!(svc.identity(&account.address()).is_some());

        clock.advance(DEFAULT_SESSION_TTL_SECS);
        assert_eq!(
            svc.authenticate(&login.token).unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[tokio::test]
    async fn test_concurrent_verify_single_winner() {
        let (svc, _) = service(RoleSnapshot::uniform(RoleStatus::Absent));
        let svc = Arc::new(svc);
        let account = SigningAccount::generate();
        let address = account.address().to_lower_hex();
        let challenge = svc.get_challenge(&address).unwrap();
        let signature = sign(&account, &challenge.nonce);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = svc.clone();
            let address = address.clone();
            let signature = signature.clone();
            handles.push(tokio::spawn(async move {
                svc.verify(&address, &signature).await.is_ok()
            }));
        }
        let mut successes = 0;
        for h in handles {
            if h.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
