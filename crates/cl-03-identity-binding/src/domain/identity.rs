//! Local identity record for an address that has proven control once.

use serde::Serialize;
use shared_types::{Address, Role};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub address: Address,
    /// Local account reference, the lowercase address.
    pub account_ref: String,
    pub display_name: String,
    /// Roles at last login. Advisory only.
    pub cached_roles: BTreeSet<Role>,
    pub created_at: u64,
    pub last_login_at: u64,
}

impl Identity {
    pub fn new(address: Address, roles: BTreeSet<Role>, now: u64) -> Self {
        let account_ref = address.to_lower_hex();
        Self {
            display_name: format!("Account for {}", &account_ref[..6]),
            account_ref,
            address,
            cached_roles: roles,
            created_at: now,
            last_login_at: now,
        }
    }
}
