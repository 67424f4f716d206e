//! # Role Flow
//!
//! Admin grants and revokes roles; the next login reflects the ledger.

#[cfg(test)]
mod tests {
    use cl_04_credential_lifecycle::fingerprint_of;
    use primitive_types::U256;
    use shared_crypto::SigningAccount;
    use shared_types::{Classify, ErrorKind, Role, RoleStatus, StorageMode};

    use crate::fixtures::World;

    /// Granting then revoking Issuer restores the original snapshot.
    #[tokio::test]
    async fn test_grant_then_revoke_restores_roles() {
        let world = World::new().await;
        let admin = world.login_as(world.admin).await.session;
        let target = SigningAccount::generate().address();

        let original = world.access.check_roles(target).await;
        assert_eq!(original.issuer, RoleStatus::Absent);

        let granted = world
            .access
            .grant_role(&admin, target, Role::Issuer)
            .await
            .unwrap();
        assert!(granted.granted && granted.gas_used > 0);
        assert_eq!(
            world.access.check_roles(target).await.issuer,
            RoleStatus::Present
        );

        world
            .access
            .revoke_role(&admin, target, Role::Issuer)
            .await
            .unwrap();
        assert_eq!(world.access.check_roles(target).await, original);
    }

    /// A freshly granted Issuer can log in and issue once funded.
    #[tokio::test]
    async fn test_new_issuer_can_issue_after_grant() {
        let world = World::new().await;
        let admin = world.login_as(world.admin).await.session;
        let registrar = world.keyring.insert(SigningAccount::generate());
        world.ledger.fund(registrar, U256::exp10(21));

        let before = world.login_as(registrar).await.session;
        assert!(!before.has_role(Role::Issuer));

        world
            .access
            .grant_role(&admin, registrar, Role::Issuer)
            .await
            .unwrap();
        let after = world.login_as(registrar).await.session;
        assert!(after.has_role(Role::Issuer));
        assert!(!after.has_role(Role::Student));

        let issued = world
            .credentials
            .issue(
                &after,
                SigningAccount::generate().address(),
                b"registrar-issued",
                StorageMode::Embedded,
            )
            .await
            .unwrap();
        assert_eq!(issued.credential.issuer, registrar);
        assert_eq!(
            issued.credential.fingerprint,
            fingerprint_of(b"registrar-issued")
        );
    }

    #[tokio::test]
    async fn test_issuer_cannot_grant_issuer() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        let txs = world.ledger.transaction_total();

        let err = world
            .access
            .grant_role(&issuer, SigningAccount::generate().address(), Role::Issuer)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(world.ledger.transaction_total(), txs);
    }

    #[tokio::test]
    async fn test_roles_unknown_while_ledger_offline() {
        let world = World::new().await;
        world.ledger.set_offline(true);

        let snapshot = world.access.check_roles(world.issuer).await;
        assert!(snapshot.is_fully_unknown());

        world.ledger.set_offline(false);
        assert_eq!(
            world.access.check_roles(world.issuer).await.issuer,
            RoleStatus::Present
        );
    }
}
