//! # Error Types
//!
//! Shared error taxonomy. Every subsystem keeps its own `thiserror` enum and
//! maps each variant onto an [`ErrorKind`] through [`Classify`], so the outer
//! surface can pick a response class without knowing subsystem internals.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse a fixed-width hex value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Cross-subsystem error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Ledger artifacts missing or unusable.
    ConfigurationError,
    /// Ledger node unreachable.
    ConnectionError,
    ChallengeExpired,
    SignatureMismatch,
    PermissionDenied,
    /// Duplicate fingerprint, or a state transition that already happened.
    Conflict,
    NotFound,
    /// Uncategorized on-chain revert.
    LedgerRevert,
    /// Content store unreachable or rejected the upload.
    UploadFailure,
    /// Malformed caller input.
    InvalidRequest,
    /// Codec or invariant failure inside this process.
    Internal,
}

impl ErrorKind {
    /// Client errors are the caller's to fix; everything else is ours.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::ChallengeExpired
                | ErrorKind::SignatureMismatch
                | ErrorKind::PermissionDenied
                | ErrorKind::Conflict
                | ErrorKind::NotFound
                | ErrorKind::InvalidRequest
        )
    }

    /// Status code the HTTP layer should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::ChallengeExpired | ErrorKind::SignatureMismatch => 401,
            ErrorKind::PermissionDenied => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::ConnectionError
            | ErrorKind::ConfigurationError
            | ErrorKind::UploadFailure => 503,
            ErrorKind::LedgerRevert | ErrorKind::Internal => 500,
        }
    }
}

/// Maps a subsystem error onto the shared taxonomy.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
