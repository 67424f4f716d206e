//! # Hashing
//!
//! | Function | Algorithm | Use |
//! |----------|-----------|-----|
//! | `keccak256` | Keccak-256 | selectors, topics, addresses, tx hashes |
//! | `sha256` | SHA-256 | credential fingerprints |
//! | `personal_message_hash` | EIP-191 v0x45 | challenge signing |

use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest a wallet signs for `personal_sign`:
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n");
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}
