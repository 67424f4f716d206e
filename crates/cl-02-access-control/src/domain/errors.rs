//! Access-control error types.

use cl_01_ledger_adapter::LedgerError;
use shared_types::{Address, Classify, ErrorKind, Role};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccessError {
    /// The acting session holds no role that manages the target role.
    #[error("{actor} may not manage the {role} role")]
    PermissionDenied { actor: Address, role: Role },

    #[error("session expired")]
    SessionExpired,

    #[error("no signing key for {0}")]
    SignerUnavailable(Address),

    #[error("invalid target account: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Classify for AccessError {
    fn kind(&self) -> ErrorKind {
        match self {
            AccessError::PermissionDenied { .. } | AccessError::SessionExpired => {
                ErrorKind::PermissionDenied
            }
            AccessError::SignerUnavailable(_) => ErrorKind::ConfigurationError,
            AccessError::InvalidTarget(_) => ErrorKind::InvalidRequest,
            AccessError::Ledger(e) => e.kind(),
        }
    }
}
