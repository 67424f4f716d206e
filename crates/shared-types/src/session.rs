//! # Session
//!
//! The authenticated principal every gated operation receives. Sessions are
//! minted by identity binding after a verified challenge; downstream
//! subsystems only read them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::entities::Address;
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub address: Address,
    pub roles: BTreeSet<Role>,
    /// Unix seconds.
    pub issued_at: u64,
    /// Unix seconds.
    pub expires_at: u64,
}

impl Session {
    pub fn new(address: Address, roles: BTreeSet<Role>, issued_at: u64, ttl_secs: u64) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            address,
            roles,
            issued_at,
            expires_at: issued_at.saturating_add(ttl_secs),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// True if any held role may manage `target`.
    pub fn can_manage(&self, target: Role) -> bool {
        self.roles.iter().any(|r| r.can_manage(target))
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}
