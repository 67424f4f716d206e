//! Ledger adapter error types.

use shared_crypto::CryptoError;
use shared_types::{Address, Classify, ErrorKind, TxHash};
use thiserror::Error;

use super::abi::AbiError;
use super::interface::InterfaceError;
use super::revert::RevertKind;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// `connect` has not succeeded yet.
    #[error("ledger not connected")]
    NotConnected,

    /// Connected, but no bound handle: artifacts missing or invalid.
    #[error("ledger program unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("ledger transport error: {0}")]
    Transport(String),

    /// JSON-RPC error that is not a revert.
    #[error("ledger rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("ledger reverted ({kind:?}): {reason}")]
    Reverted { kind: RevertKind, reason: String },

    /// The estimate for a call exceeds the gas limit transactions are sent
    /// with; nothing was submitted.
    #[error("call needs {required} gas, above the configured limit of {limit}")]
    GasLimitExceeded { required: u64, limit: u64 },

    /// Mined with failure status and no reason available.
    #[error("transaction {tx_hash} failed on-ledger")]
    TransactionFailed { tx_hash: TxHash },

    #[error("no receipt for {tx_hash} within the configured timeout")]
    ReceiptTimeout { tx_hash: TxHash },

    #[error("abi codec: {0}")]
    Abi(#[from] AbiError),

    #[error("interface description: {0}")]
    Interface(#[from] InterfaceError),

    #[error("artifact: {0}")]
    Artifact(String),

    #[error("no signing key for {0}")]
    SignerUnavailable(Address),

    #[error("signing: {0}")]
    Signing(#[from] CryptoError),

    /// The node answered with something we could not interpret.
    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Build a revert error from a raw reason string.
    pub fn reverted(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        LedgerError::Reverted {
            kind: RevertKind::classify(&reason),
            reason,
        }
    }

    pub fn revert_kind(&self) -> Option<RevertKind> {
        match self {
            LedgerError::Reverted { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl Classify for LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotConnected
            | LedgerError::Transport(_)
            | LedgerError::ReceiptTimeout { .. } => ErrorKind::ConnectionError,
            LedgerError::Unavailable { .. }
            | LedgerError::Interface(_)
            | LedgerError::Artifact(_)
            | LedgerError::SignerUnavailable(_) => ErrorKind::ConfigurationError,
            LedgerError::Reverted { kind, .. } => match kind {
                RevertKind::AlreadyExists | RevertKind::AlreadyRevoked => ErrorKind::Conflict,
                RevertKind::NotFound => ErrorKind::NotFound,
                RevertKind::Unauthorized => ErrorKind::PermissionDenied,
                RevertKind::Other => ErrorKind::LedgerRevert,
            },
            LedgerError::GasLimitExceeded { .. } => ErrorKind::InvalidRequest,
            LedgerError::Rpc { .. } | LedgerError::TransactionFailed { .. } => {
                ErrorKind::LedgerRevert
            }
            LedgerError::Abi(_) | LedgerError::Signing(_) | LedgerError::Malformed(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_mapping() {
        assert_eq!(
            LedgerError::reverted("Credential already exists").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LedgerError::reverted("Credential does not exist").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::reverted("something odd").kind(),
            ErrorKind::LedgerRevert
        );
    }

    #[test]
    fn test_gas_limit_exceeded_is_client_error() {
        let err = LedgerError::GasLimitExceeded {
            required: 3_000_000,
            limit: 2_000_000,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_availability_mapping() {
        assert_eq!(LedgerError::NotConnected.kind(), ErrorKind::ConnectionError);
        assert_eq!(
            LedgerError::Unavailable {
                reason: "abi missing".into()
            }
            .kind(),
            ErrorKind::ConfigurationError
        );
    }
}
