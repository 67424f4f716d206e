//! Credential lifecycle errors.

use cl_01_ledger_adapter::{LedgerError, RevertKind};
use shared_types::{Address, Classify, ErrorKind, Fingerprint, Role};
use thiserror::Error;

/// Content store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentStoreError {
    #[error("content store unreachable: {0}")]
    Unreachable(String),

    #[error("content store returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed content store response: {0}")]
    Malformed(String),

    #[error("content not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("{actor} lacks the {required} role")]
    PermissionDenied { actor: Address, required: Role },

    #[error("session expired")]
    SessionExpired,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("embedded payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("credential {0} not found")]
    NotFound(Fingerprint),

    #[error("no signing key for {0}")]
    SignerUnavailable(Address),

    #[error("upload failed: {0}")]
    Upload(#[from] ContentStoreError),

    /// Retrieved content does not hash to the fingerprint it was stored under.
    #[error("content integrity check failed for {expected}: got {actual}")]
    IntegrityMismatch {
        expected: Fingerprint,
        actual: Fingerprint,
    },

    #[error(transparent)]
    Ledger(LedgerError),
}

impl LifecycleError {
    /// Maps a ledger failure for an operation on `fingerprint`, turning
    /// classified reverts into domain errors.
    pub fn from_ledger(fingerprint: Fingerprint, e: LedgerError) -> Self {
        match e.revert_kind() {
            Some(RevertKind::AlreadyExists) | Some(RevertKind::AlreadyRevoked) => {
                LifecycleError::Conflict(e.to_string())
            }
            Some(RevertKind::NotFound) => LifecycleError::NotFound(fingerprint),
            _ => LifecycleError::Ledger(e),
        }
    }
}

impl From<LedgerError> for LifecycleError {
    fn from(e: LedgerError) -> Self {
        LifecycleError::Ledger(e)
    }
}

impl Classify for LifecycleError {
    fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::PermissionDenied { .. } | LifecycleError::SessionExpired => {
                ErrorKind::PermissionDenied
            }
            LifecycleError::InvalidRequest(_) | LifecycleError::PayloadTooLarge { .. } => {
                ErrorKind::InvalidRequest
            }
            LifecycleError::Conflict(_) => ErrorKind::Conflict,
            LifecycleError::NotFound(_) => ErrorKind::NotFound,
            LifecycleError::SignerUnavailable(_) => ErrorKind::ConfigurationError,
            LifecycleError::Upload(_) | LifecycleError::IntegrityMismatch { .. } => {
                ErrorKind::UploadFailure
            }
            LifecycleError::Ledger(e) => e.kind(),
        }
    }
}
