//! Identity binding errors.

use shared_types::{Address, Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// No live challenge for the address: never requested, expired, or
    /// already consumed.
    #[error("challenge expired or not found for {0}")]
    ChallengeExpired(Address),

    #[error("signature verification failed: recovered {recovered}, expected {expected}")]
    SignatureMismatch { expected: Address, recovered: Address },

    /// Every role check came back unknown.
    #[error("role lookup unavailable for {0}")]
    RolesUnavailable(Address),

    #[error("invalid session token")]
    InvalidToken,

    #[error("session expired")]
    SessionExpired,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Classify for IdentityError {
    fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::InvalidAddress(_) | IdentityError::InvalidSignature(_) => {
                ErrorKind::InvalidRequest
            }
            IdentityError::ChallengeExpired(_) => ErrorKind::ChallengeExpired,
            IdentityError::SignatureMismatch { .. } => ErrorKind::SignatureMismatch,
            IdentityError::RolesUnavailable(_) => ErrorKind::ConnectionError,
            IdentityError::InvalidToken | IdentityError::SessionExpired => {
                ErrorKind::PermissionDenied
            }
            IdentityError::Configuration(_) => ErrorKind::ConfigurationError,
            IdentityError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl IdentityError {
    /// Label for the auth attempt counter.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            IdentityError::ChallengeExpired(_) => "expired",
            IdentityError::SignatureMismatch { .. } => "mismatch",
            IdentityError::RolesUnavailable(_) => "unavailable",
            IdentityError::InvalidAddress(_) | IdentityError::InvalidSignature(_) => "invalid",
            _ => "error",
        }
    }
}
