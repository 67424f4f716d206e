//! # Identity Flow
//!
//! Challenge → personal-message signature → verify → session, against roles
//! read live from the ledger.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cl_03_identity_binding::IdentityService;
    use shared_crypto::SigningAccount;
    use shared_types::{Classify, ErrorKind, Role};

    use crate::fixtures::World;

    fn sign(account: &SigningAccount, nonce: &str) -> String {
        account
            .sign_personal_message(nonce.as_bytes())
            .unwrap()
            .to_hex()
    }

    // =========================================================================
    // ONE-TIME CHALLENGES
    // =========================================================================

    /// A challenge verifies once; replaying the same signature fails.
    #[tokio::test]
    async fn test_challenge_succeeds_exactly_once() {
        let world = World::new().await;
        let student = SigningAccount::generate();
        let address = student.address().to_checksum();

        let challenge = world.identity.get_challenge(&address).unwrap();
        let signature = sign(&student, &challenge.nonce);

        let login = world.identity.verify(&address, &signature).await.unwrap();
        assert_eq!(login.session.address, student.address());

        let err = world
            .identity
            .verify(&address, &signature)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChallengeExpired);
    }

    #[tokio::test]
    async fn test_challenge_lapses_after_ttl() {
        let world = World::new().await;
        let student = SigningAccount::generate();
        let address = student.address().to_checksum();

        let challenge = world.identity.get_challenge(&address).unwrap();
        world.clock.advance(challenge.ttl_secs);

        let err = world
            .identity
            .verify(&address, &sign(&student, &challenge.nonce))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChallengeExpired);
    }

    #[tokio::test]
    async fn test_signature_from_another_key_is_mismatch() {
        let world = World::new().await;
        let student = SigningAccount::generate();
        let impostor = SigningAccount::generate();
        let address = student.address().to_checksum();

        let challenge = world.identity.get_challenge(&address).unwrap();
        let err = world
            .identity
            .verify(&address, &sign(&impostor, &challenge.nonce))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureMismatch);

        // A mismatch does not burn the challenge.
        let login = world
            .identity
            .verify(&address, &sign(&student, &challenge.nonce))
            .await
            .unwrap();
        assert_eq!(login.session.address, student.address());
    }

    /// Racing verifications of one challenge: exactly one wins.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_verify_single_winner() {
        let world = World::new().await;
        let student = SigningAccount::generate();
        let address = student.address().to_checksum();
        let challenge = world.identity.get_challenge(&address).unwrap();
        let signature = sign(&student, &challenge.nonce);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let identity: Arc<IdentityService> = world.identity.clone();
            let address = address.clone();
            let signature = signature.clone();
            tasks.push(tokio::spawn(async move {
                identity.verify(&address, &signature).await
            }));
        }

        let mut winners = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert_eq!(e.kind(), ErrorKind::ChallengeExpired),
            }
        }
        assert_eq!(winners, 1);
    }

    // =========================================================================
    // SESSIONS CARRY LEDGER ROLES
    // =========================================================================

    #[tokio::test]
    async fn test_sessions_carry_ledger_roles() {
        let world = World::new().await;

        let admin = world.login_as(world.admin).await;
        assert!(admin.session.has_role(Role::Admin));

        let issuer = world.login_as(world.issuer).await;
        assert!(issuer.session.has_role(Role::Issuer));
        assert!(!issuer.session.has_role(Role::Admin));

        let student = world.login(&SigningAccount::generate()).await;
        assert_eq!(student.session.roles.len(), 1);
        assert!(student.session.has_role(Role::Student));
    }

    #[tokio::test]
    async fn test_token_round_trip_and_expiry() {
        let world = World::new().await;
        let login = world.login_as(world.issuer).await;

        let session = world.identity.authenticate(&login.token).unwrap();
        assert_eq!(session, login.session);
        assert!(world.identity.identity(&world.issuer).is_some());

        world
            .clock
            .advance(login.session.expires_at - login.session.issued_at);
        let err = world.identity.authenticate(&login.token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_login_fails_when_ledger_unreachable() {
        let world = World::new().await;
        let student = SigningAccount::generate();
        let address = student.address().to_checksum();
        let challenge = world.identity.get_challenge(&address).unwrap();

        world.ledger.set_offline(true);
        let err = world
            .identity
            .verify(&address, &sign(&student, &challenge.nonce))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
    }
}
