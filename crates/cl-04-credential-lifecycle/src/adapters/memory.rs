//! In-memory content store and transaction mirror.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::sha256;
use shared_types::Fingerprint;
use std::collections::HashMap;

use crate::domain::{ContentStoreError, TransactionRecord};
use crate::ports::{ContentStore, ContentStoreStatus, TransactionMirror};

#[derive(Debug, Default)]
struct StoreState {
    blobs: HashMap<String, Vec<u8>>,
    offline: bool,
    /// Content id -> replacement bytes served by `cat`.
    corrupted: HashMap<String, Vec<u8>>,
}

/// Content ids look like CIDv0 (`Qm` + 44 chars) so pointer-shape
/// detection treats them as external.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    state: RwLock<StoreState>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_id(content: &[u8]) -> String {
        format!("Qm{}", &hex::encode(sha256(content))[..44])
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.write().offline = offline;
    }

    /// Makes `cat` return `bytes` for `content_id`.
    pub fn corrupt(&self, content_id: &str, bytes: Vec<u8>) {
        self.state
            .write()
            .corrupted
            .insert(content_id.to_string(), bytes);
    }

    pub fn len(&self) -> usize {
        self.state.read().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn add(&self, content: &[u8]) -> Result<String, ContentStoreError> {
        let mut state = self.state.write();
        if state.offline {
            return Err(ContentStoreError::Unreachable("connection refused".into()));
        }
        let cid = Self::content_id(content);
        state.blobs.insert(cid.clone(), content.to_vec());
        Ok(cid)
    }

    async fn cat(&self, content_id: &str) -> Result<Vec<u8>, ContentStoreError> {
        let state = self.state.read();
        if state.offline {
            return Err(ContentStoreError::Unreachable("connection refused".into()));
        }
        if let Some(bytes) = state.corrupted.get(content_id) {
            return Ok(bytes.clone());
        }
        state
            .blobs
            .get(content_id)
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(content_id.to_string()))
    }

    async fn status(&self) -> ContentStoreStatus {
        if self.state.read().offline {
            ContentStoreStatus::Offline {
                reason: "connection refused".into(),
            }
        } else {
            ContentStoreStatus::Online {
                node_id: "in-memory".into(),
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMirror {
    records: RwLock<HashMap<Fingerprint, TransactionRecord>>,
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionMirror for InMemoryMirror {
    fn upsert(&self, record: TransactionRecord) {
        self.records.write().insert(record.fingerprint, record);
    }

    fn get(&self, fingerprint: &Fingerprint) -> Option<TransactionRecord> {
        self.records.read().get(fingerprint).cloned()
    }

    fn list(&self) -> Vec<TransactionRecord> {
        let mut all: Vec<_> = self.records.read().values().cloned().collect();
        all.sort_by_key(|r| std::cmp::Reverse(r.updated_at));
        all
    }
}
