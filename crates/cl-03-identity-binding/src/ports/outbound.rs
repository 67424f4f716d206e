//! Outbound ports for identity binding.

use async_trait::async_trait;
use shared_types::{Address, Role, RoleSnapshot};
use std::collections::BTreeSet;

use crate::domain::Identity;

/// Per-role membership lookup. Implemented by the access-control service.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve(&self, address: Address) -> RoleSnapshot;
}

/// Local identity records.
pub trait IdentityStore: Send + Sync {
    /// Creates the identity on first login, otherwise refreshes its roles and
    /// login time. Repeating with the same input leaves one record.
    fn upsert(&self, address: Address, roles: BTreeSet<Role>, now: u64) -> Identity;

    fn get(&self, address: &Address) -> Option<Identity>;

    fn list(&self) -> Vec<Identity>;
}
