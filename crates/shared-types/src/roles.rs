//! # Roles
//!
//! The three fixed permission buckets and the three-valued result of asking
//! the ledger whether an address holds one.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeSet;
use std::fmt;

use crate::entities::RoleId;

/// Fixed role set recognised by the registry program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Issuer,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Issuer, Role::Student];

    /// Name hashed into the on-ledger role identifier.
    pub fn ledger_name(self) -> &'static str {
        match self {
            Role::Admin => "DEFAULT_ADMIN_ROLE",
            Role::Issuer => "ISSUER_ROLE",
            Role::Student => "STUDENT_ROLE",
        }
    }

    /// `keccak256(ledger_name)`.
    pub fn id(self) -> RoleId {
        let digest = Keccak256::digest(self.ledger_name().as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out.into()
    }

    pub fn from_id(id: &RoleId) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.id() == *id)
    }

    /// Whether a holder of `self` may grant or revoke `target`.
    ///
    /// Admin manages every role; Issuer manages Student only.
    pub fn can_manage(self, target: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::Issuer => target == Role::Student,
            Role::Student => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Issuer => f.write_str("issuer"),
            Role::Student => f.write_str("student"),
        }
    }
}

/// Outcome of a single role-membership query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Present,
    Absent,
    /// The query itself failed; membership is not known.
    Unknown,
}

/// Per-role membership for one address, as read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub admin: RoleStatus,
    pub issuer: RoleStatus,
    pub student: RoleStatus,
}

impl RoleSnapshot {
    pub fn uniform(status: RoleStatus) -> Self {
        Self {
            admin: status,
            issuer: status,
            student: status,
        }
    }

    pub fn status(&self, role: Role) -> RoleStatus {
        match role {
            Role::Admin => self.admin,
            Role::Issuer => self.issuer,
            Role::Student => self.student,
        }
    }

    pub fn set(&mut self, role: Role, status: RoleStatus) {
        match role {
            Role::Admin => self.admin = status,
            Role::Issuer => self.issuer = status,
            Role::Student => self.student = status,
        }
    }

    /// Roles confirmed present.
    pub fn present(&self) -> BTreeSet<Role> {
        Role::ALL
            .into_iter()
            .filter(|r| self.status(*r) == RoleStatus::Present)
            .collect()
    }

    pub fn is_fully_unknown(&self) -> bool {
        Role::ALL
            .into_iter()
            .all(|r| self.status(r) == RoleStatus::Unknown)
    }

    pub fn is_fully_absent(&self) -> bool {
        Role::ALL
            .into_iter()
            .all(|r| self.status(r) == RoleStatus::Absent)
    }

    /// The single default-role policy used by every caller.
    ///
    /// Confirmed roles are granted. `Unknown` never grants anything. The
    /// implicit Student role is added only when every role is definitively
    /// `Absent`; a partial failure does not fall back to Student.
    pub fn effective_roles(&self) -> BTreeSet<Role> {
        let mut roles = self.present();
        if self.is_fully_absent() {
            roles.insert(Role::Student);
        }
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids_are_distinct_and_stable() {
        let ids: BTreeSet<_> = Role::ALL.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(Role::Issuer.id(), Role::Issuer.id());
        assert_eq!(Role::from_id(&Role::Admin.id()), Some(Role::Admin));
    }

    #[test]
    fn test_admin_role_id_vector() {
        // keccak256("DEFAULT_ADMIN_ROLE")
        assert_eq!(
            Role::Admin.id().to_hex(),
            "0x1effbbff9c66c5e59634f24fe842750c60d18891155c32dd155fc2d661a4c86d"
        );
    }

    #[test]
    fn test_management_matrix() {
        assert!(Role::Admin.can_manage(Role::Admin));
        assert!(Role::Admin.can_manage(Role::Issuer));
        assert!(Role::Issuer.can_manage(Role::Student));
        assert!(!Role::Issuer.can_manage(Role::Issuer));
        assert!(!Role::Student.can_manage(Role::Student));
    }

    #[test]
    fn test_default_student_only_when_all_absent() {
        let absent = RoleSnapshot::uniform(RoleStatus::Absent);
        assert_eq!(absent.effective_roles(), BTreeSet::from([Role::Student]));

        let mut partial = RoleSnapshot::uniform(RoleStatus::Absent);
        partial.set(Role::Admin, RoleStatus::Unknown);
        assert!(partial.effective_roles().is_empty());
    }

    #[test]
    fn test_unknown_never_grants() {
        let mut snap = RoleSnapshot::uniform(RoleStatus::Unknown);
        snap.set(Role::Issuer, RoleStatus::Present);
        assert_eq!(snap.effective_roles(), BTreeSet::from([Role::Issuer]));
    }
}
