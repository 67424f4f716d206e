//! Local role cache.
//!
//! Refreshed from every ledger check and updated on confirmed grant/revoke.
//! Authorization never reads it; it only serves listings and diagnostics.

use dashmap::DashMap;
use serde::Serialize;
use shared_types::{Address, Role, RoleSnapshot, RoleStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedRoles {
    pub snapshot: RoleSnapshot,
    /// Unix seconds of the last update.
    pub updated_at: u64,
}

#[derive(Debug, Default)]
pub struct RoleCache {
    entries: DashMap<Address, CachedRoles>,
}

impl RoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fresh snapshot. `Unknown` results keep the previously cached
    /// status for that role.
    pub fn record(&self, address: Address, snapshot: &RoleSnapshot, now: u64) {
        let mut entry = self.entries.entry(address).or_insert_with(|| CachedRoles {
            snapshot: RoleSnapshot::uniform(RoleStatus::Unknown),
            updated_at: now,
        });
        for role in Role::ALL {
            let status = snapshot.status(role);
            if status != RoleStatus::Unknown {
                entry.snapshot.set(role, status);
            }
        }
        entry.updated_at = now;
    }

    pub fn set(&self, address: Address, role: Role, status: RoleStatus, now: u64) {
        let mut entry = self.entries.entry(address).or_insert_with(|| CachedRoles {
            snapshot: RoleSnapshot::uniform(RoleStatus::Unknown),
            updated_at: now,
        });
        entry.snapshot.set(role, status);
        entry.updated_at = now;
    }

    pub fn get(&self, address: &Address) -> Option<CachedRoles> {
        self.entries.get(address).map(|e| e.clone())
    }

    /// Cached holders of `role`, sorted.
    pub fn holders(&self, role: Role) -> Vec<Address> {
        let mut out: Vec<Address> = self
            .entries
            .iter()
            .filter(|e| e.snapshot.status(role) == RoleStatus::Present)
            .map(|e| *e.key())
            .collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
