//! # Credential Flow
//!
//! Issuer login → issue → verify → revoke → verify, through the same
//! services the runtime wires.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use cl_04_credential_lifecycle::{
        fingerprint_of, CredentialService, InMemoryContentStore, TransactionMirror,
    };
    use shared_crypto::SigningAccount;
    use shared_types::{Classify, ErrorKind, StorageMode};

    use crate::fixtures::World;

    // =========================================================================
    // DIPLOMA-1
    // =========================================================================

    /// Issue, verify, revoke, verify again.
    #[tokio::test]
    async fn test_diploma_lifecycle() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        let student = SigningAccount::generate().address();
        let fp = fingerprint_of(b"DIPLOMA-1");

        let issued = world
            .credentials
            .issue(&issuer, student, b"DIPLOMA-1", StorageMode::Embedded)
            .await
            .unwrap();
        assert_eq!(issued.credential.fingerprint, fp);
        assert_eq!(issued.credential.issuer, world.issuer);

        let before = world.credentials.verify(fp).await.unwrap();
        assert!(before.exists && before.is_valid && !before.is_revoked);
        assert_eq!(before.recipient, student);

        world.credentials.revoke(&issuer, fp).await.unwrap();

        let after = world.credentials.verify(fp).await.unwrap();
        assert!(after.exists && after.is_revoked && !after.is_valid);
        assert!(world.mirror.get(&fp).unwrap().revoked);

        let err = world.credentials.revoke(&issuer, fp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_fingerprint_deterministic_and_duplicate_conflicts() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        let student = SigningAccount::generate().address();
        assert_eq!(fingerprint_of(b"transcript"), fingerprint_of(b"transcript"));

        world
            .credentials
            .issue(&issuer, student, b"transcript", StorageMode::Embedded)
            .await
            .unwrap();
        let txs = world.ledger.transaction_total();

        let err = world
            .credentials
            .issue(&issuer, student, b"transcript", StorageMode::External)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(world.ledger.transaction_total(), txs);
        assert!(world.content.is_empty());
    }

    /// A student session cannot issue, and nothing reaches the ledger.
    #[tokio::test]
    async fn test_student_issue_denied() {
        let world = World::new().await;
        let student = world.login(&SigningAccount::generate()).await.session;

        let err = world
            .credentials
            .issue(&student, student.address, b"self-awarded", StorageMode::Embedded)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(world.ledger.transaction_total(), 0);
        assert_eq!(world.ledger.credential_count(), 0);

        let report = world.audit.replay_full().await.unwrap();
        assert_eq!(report.totals.issued, 0);
    }

    // =========================================================================
    // EXTERNAL STORAGE
    // =========================================================================

    #[tokio::test]
    async fn test_external_credential_retrieved_by_recipient() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        let student_key = SigningAccount::generate();
        let content = vec![0xabu8; 64 * 1024];

        let issued = world
            .credentials
            .issue(&issuer, student_key.address(), &content, StorageMode::External)
            .await
            .unwrap();
        assert_eq!(
            issued.credential.pointer,
            InMemoryContentStore::content_id(&content).into_bytes()
        );

        let student = world.login(&student_key).await.session;
        let fetched = world
            .credentials
            .retrieve_content(&student, issued.credential.fingerprint)
            .await
            .unwrap();
        assert_eq!(fetched, content);

        let stranger = world.login(&SigningAccount::generate()).await.session;
        let err = world
            .credentials
            .retrieve_content(&stranger, issued.credential.fingerprint)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_ledger_untouched() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        world.content.set_offline(true);

        let err = world
            .credentials
            .issue(
                &issuer,
                SigningAccount::generate().address(),
                b"offline",
                StorageMode::External,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UploadFailure);
        assert_eq!(world.ledger.transaction_total(), 0);
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    /// Concurrent issuance from one signer: every transaction lands and the
    /// account nonce advances once per credential.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_issuance_contiguous_nonces() {
        let world = World::new().await;
        let issuer = world.login_as(world.issuer).await.session;
        let student = SigningAccount::generate().address();
        const N: usize = 12;

        let mut tasks = Vec::new();
        for i in 0..N {
            let credentials: Arc<CredentialService> = world.credentials.clone();
            let session = issuer.clone();
            tasks.push(tokio::spawn(async move {
                let content = format!("certificate-{i}");
                credentials
                    .issue(&session, student, content.as_bytes(), StorageMode::Embedded)
                    .await
            }));
        }

        let mut hashes = BTreeSet::new();
        for task in tasks {
            let issued = task.await.unwrap().unwrap();
            hashes.insert(issued.tx_hash);
        }
        assert_eq!(hashes.len(), N);
        assert_eq!(world.ledger.credential_count(), N);
        assert_eq!(world.ledger.transaction_total(), N);

        let rpc = world.adapter.rpc().unwrap();
        assert_eq!(
            rpc.transaction_count(world.issuer, false).await.unwrap(),
            N as u64
        );
    }
}
