//! # Shared Crypto
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, SHA-256, EIP-191 | selectors, fingerprints, challenge digests |
//! | `ecdsa` | secp256k1 | address recovery, transaction and message signing |
//! | `keyring` | - | signer lookup by account address |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic, low-S normalization (EIP-2)
//! - **Key material**: zeroized intermediates, redacted `Debug`

#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod keyring;

// Re-exports
pub use ecdsa::{
    address_from_pubkey, recover_address, recover_personal_signer, RecoverableSignature,
    SigningAccount,
};
pub use errors::CryptoError;
pub use hashing::{keccak256, personal_message_hash, sha256};
pub use keyring::Keyring;
