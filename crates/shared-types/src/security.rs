//! # Message Authentication
//!
//! HMAC-SHA256 helpers shared by anything that mints or checks opaque
//! tokens. Verification is constant-time (`Mac::verify_slice`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Minimum secret length accepted for token signing.
pub const MIN_SECRET_LEN: usize = 32;

/// Computes the HMAC-SHA256 tag of `message` under `secret`.
///
/// Returns `None` only if the key is rejected by the MAC implementation,
/// which HMAC never does for non-empty keys.
pub fn hmac_sign(secret: &[u8], message: &[u8]) -> Option<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&tag);
    Some(out)
}

/// Validates an HMAC-SHA256 tag in constant time.
pub fn hmac_verify(secret: &[u8], message: &[u8], tag: &[u8]) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(message);
    mac.verify_slice(tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let secret = [7u8; 32];
        let tag = hmac_sign(&secret, b"payload").unwrap();
        assert!(hmac_verify(&secret, b"payload", &tag));
    }

    #[test]
    fn test_tampered_message_rejected() {
        let secret = [7u8; 32];
        let tag = hmac_sign(&secret, b"payload").unwrap();
        assert!(!hmac_verify(&secret, b"payloaD", &tag));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let tag = hmac_sign(&[1u8; 32], b"payload").unwrap();
        assert!(!hmac_verify(&[2u8; 32], b"payload", &tag));
    }

    #[test]
    fn test_truncated_tag_rejected() {
        let secret = [7u8; 32];
        let tag = hmac_sign(&secret, b"payload").unwrap();
        assert!(!hmac_verify(&secret, b"payload", &tag[..16]));
    }
}
