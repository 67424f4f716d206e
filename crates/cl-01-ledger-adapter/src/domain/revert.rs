//! Revert reason classification.
//!
//! The registry program reports failures as free-text reasons. Callers need
//! them bucketed so "already exists" becomes a conflict instead of a generic
//! ledger failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevertKind {
    AlreadyExists,
    AlreadyRevoked,
    NotFound,
    Unauthorized,
    Other,
}

impl RevertKind {
    pub fn classify(reason: &str) -> Self {
        let lower = reason.to_ascii_lowercase();

        if lower.contains("already revoked") {
            RevertKind::AlreadyRevoked
        } else if lower.contains("already exists") || lower.contains("already registered") {
            RevertKind::AlreadyExists
        } else if lower.contains("does not exist")
            || lower.contains("not found")
            || lower.contains("not registered")
        {
            RevertKind::NotFound
        } else if lower.contains("accesscontrol")
            || lower.contains("missing role")
            || lower.contains("unauthorized")
            || lower.contains("not authorized")
        {
            RevertKind::Unauthorized
        } else {
            RevertKind::Other
        }
    }
}

/// Strip node-specific prefixes from a revert message.
pub fn normalize_reason(message: &str) -> String {
    let trimmed = message.trim();
    for prefix in [
        "execution reverted: ",
        "VM Exception while processing transaction: reverted with reason string ",
        "VM Exception while processing transaction: revert ",
        "execution reverted",
    ] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            let rest = rest.trim().trim_matches('\'');
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    trimmed.to_string()
}
