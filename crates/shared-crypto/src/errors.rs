//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature bytes are not `r || s || v` (65 bytes).
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Recovery id outside {0, 1, 27, 28}.
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// High-S signature (EIP-2).
    #[error("Malleable signature: s is in the upper half of the curve order")]
    MalleableSignature,

    /// Public key recovery failed.
    #[error("Public key recovery failed")]
    RecoveryFailed,

    /// Private key bytes are not a valid secp256k1 scalar.
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Signing failed inside the curve implementation.
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}
