//! Outbound ports for the credential lifecycle.

use async_trait::async_trait;
use serde::Serialize;
use shared_types::Fingerprint;

use crate::domain::{ContentStoreError, TransactionRecord};

// =============================================================================
// CONTENT STORE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContentStoreStatus {
    Online { node_id: String },
    Offline { reason: String },
}

impl ContentStoreStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ContentStoreStatus::Online { .. })
    }
}

/// Content-addressed blob store for External credentials.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stores `content` and returns its content identifier.
    async fn add(&self, content: &[u8]) -> Result<String, ContentStoreError>;

    async fn cat(&self, content_id: &str) -> Result<Vec<u8>, ContentStoreError>;

    async fn status(&self) -> ContentStoreStatus;
}

// =============================================================================
// TRANSACTION MIRROR
// =============================================================================

/// Local copy of credential transactions. Never authoritative.
pub trait TransactionMirror: Send + Sync {
    fn upsert(&self, record: TransactionRecord);

    fn get(&self, fingerprint: &Fingerprint) -> Option<TransactionRecord>;

    fn list(&self) -> Vec<TransactionRecord>;
}
