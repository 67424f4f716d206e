//! # Audit Flow
//!
//! The incremental projection, caught up between writes, must agree with a
//! full replay from genesis.

#[cfg(test)]
mod tests {
    use cl_04_credential_lifecycle::fingerprint_of;
    use cl_05_audit_projection::AuditEventKind;
    use shared_crypto::SigningAccount;
    use shared_types::StorageMode;

    use crate::fixtures::World;

    #[tokio::test]
    async fn test_projection_equals_full_replay() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        let alice = SigningAccount::generate().address();
        let bob = SigningAccount::generate().address();

        let plan = [
            ("alice-bsc", alice, StorageMode::Embedded),
            ("alice-msc", alice, StorageMode::External),
            ("bob-bsc", bob, StorageMode::Embedded),
            ("bob-cert", bob, StorageMode::External),
            ("alice-cert", alice, StorageMode::Embedded),
        ];
        for (i, (content, recipient, mode)) in plan.into_iter().enumerate() {
            world
                .credentials
                .issue(&issuer, recipient, content.as_bytes(), mode)
                .await
                .unwrap();
            if i % 2 == 0 {
                world.audit.catch_up().await.unwrap();
            }
        }
        world
            .credentials
            .revoke(&issuer, fingerprint_of(b"bob-bsc"))
            .await
            .unwrap();

        let projected = world.audit.report().await.unwrap();
        let replayed = world.audit.replay_full().await.unwrap();
        assert_eq!(projected, replayed);
        assert_eq!(replayed.totals.issued, 5);
        assert_eq!(replayed.totals.revoked, 1);
        assert_eq!(replayed.totals.external, 2);
        assert_eq!(replayed.totals.embedded, 3);

        let alices = world.audit.credentials_for_recipient(alice).await.unwrap();
        assert_eq!(alices.len(), 3);
        let bobs = world.audit.credentials_for_recipient(bob).await.unwrap();
        assert_eq!(bobs.iter().filter(|c| c.revoked).count(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_follows_ledger() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        let student = SigningAccount::generate().address();

        for content in ["one", "two", "three"] {
            world
                .credentials
                .issue(&issuer, student, content.as_bytes(), StorageMode::Embedded)
                .await
                .unwrap();
        }
        world
            .credentials
            .revoke(&issuer, fingerprint_of(b"two"))
            .await
            .unwrap();

        let dash = world.audit.dashboard().await;
        assert!(!dash.lagging);
        assert_eq!(dash.totals.issued, 3);
        assert_eq!(dash.active, 2);
        assert_eq!(dash.recent.len(), 4);
        assert_eq!(dash.recent[0].kind, AuditEventKind::Revoked);
        assert_eq!(dash.recent[0].fingerprint, fingerprint_of(b"two"));
        assert_eq!(dash.recent[1].fingerprint, fingerprint_of(b"three"));
        assert_eq!(dash.signer, Some(world.issuer));
        assert!(dash.signer_balance.is_some());
        assert!(dash.totals.cumulative_gas > 0);
    }
}
