//! In-memory identity store.

use parking_lot::RwLock;
use shared_types::{Address, Role};
use std::collections::{BTreeSet, HashMap};

use crate::domain::Identity;
use crate::ports::IdentityStore;

#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    records: RwLock<HashMap<Address, Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn upsert(&self, address: Address, roles: BTreeSet<Role>, now: u64) -> Identity {
        let mut records = self.records.write();
        let record = records
            .entry(address)
            .and_modify(|existing| {
                existing.cached_roles = roles.clone();
                existing.last_login_at = now;
            })
            .or_insert_with(|| Identity::new(address, roles, now));
        record.clone()
    }

    fn get(&self, address: &Address) -> Option<Identity> {
        self.records.read().get(address).cloned()
    }

    fn list(&self) -> Vec<Identity> {
        let mut all: Vec<Identity> = self.records.read().values().cloned().collect();
        all.sort_by_key(|i| i.address);
        all
    }
}
