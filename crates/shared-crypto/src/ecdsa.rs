//! # ECDSA Signatures (secp256k1)
//!
//! Recoverable signatures in the account-ledger convention: 65 bytes
//! `r || s || v`, address = last 20 bytes of `keccak256(uncompressed_pubkey[1..])`.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization on sign, low-S enforcement on recover (EIP-2)
//! - Constant-time S comparison via `subtle`

use crate::hashing::{keccak256, personal_message_hash};
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use shared_types::Address;
use std::fmt;
use std::str::FromStr;
use subtle::Choice;
use zeroize::Zeroize;

/// Half of the secp256k1 curve order.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

// =============================================================================
// RECOVERABLE SIGNATURE
// =============================================================================

/// `r || s || v` signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// 0/1 or 27/28.
    pub v: u8,
}

impl RecoverableSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 65 {
            return Err(CryptoError::InvalidSignatureFormat);
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v: bytes[64] })
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Recovery parity normalized to 0/1.
    pub fn parity(&self) -> Result<u8, CryptoError> {
        parse_recovery_id(self.v).map(|id| id.to_byte())
    }
}

impl FromStr for RecoverableSignature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits).map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

// =============================================================================
// RECOVERY
// =============================================================================

/// Recover the signer's address from a 32-byte prehash.
pub fn recover_address(
    prehash: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    let recovery_id = parse_recovery_id(signature.v)?;

    if !is_low_s(&signature.s) {
        return Err(CryptoError::MalleableSignature);
    }

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let parsed = Signature::from_slice(&sig_bytes);
    sig_bytes.zeroize();
    let sig = parsed.map_err(|_| CryptoError::InvalidSignatureFormat)?;

    let recovered = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(address_from_pubkey(&recovered))
}

/// Recover the signer of a `personal_sign` message.
pub fn recover_personal_signer(
    message: &[u8],
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    recover_address(&personal_message_hash(message), signature)
}

/// Derive the account address from a public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, CryptoError> {
    let normalized = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(CryptoError::InvalidRecoveryId(other)),
    };
    RecoveryId::from_byte(normalized).ok_or(CryptoError::InvalidRecoveryId(v))
}

/// Constant-time `s < n/2`.
fn is_low_s(s: &[u8; 32]) -> bool {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let not_decided = !(less | greater);
        let byte_less = Choice::from((s[i] < SECP256K1_HALF_ORDER[i]) as u8);
        let byte_greater = Choice::from((s[i] > SECP256K1_HALF_ORDER[i]) as u8);
        less |= not_decided & byte_less;
        greater |= not_decided & byte_greater;
    }

    less.into()
}

// =============================================================================
// SIGNING ACCOUNT
// =============================================================================

/// A secp256k1 key that signs ledger transactions and personal messages.
pub struct SigningAccount {
    signing_key: SigningKey,
    address: Address,
}

impl SigningAccount {
    /// Generate a random account.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Create from a hex secret (with or without `0x`).
    pub fn from_hex(secret: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(secret.trim().trim_start_matches("0x"))
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        let account = Self::from_bytes(&bytes);
        bytes.zeroize();
        account
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_from_pubkey(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte prehash; `v` is the raw parity (0/1).
    pub fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (mut sig, mut recid) = self
            .signing_key
            .sign_prehash_recoverable(prehash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
        }

        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            v: recid.to_byte(),
        })
    }

    /// `personal_sign`; `v` is 27/28 like wallet output.
    pub fn sign_personal_message(
        &self,
        message: &[u8],
    ) -> Result<RecoverableSignature, CryptoError> {
        let mut sig = self.sign_prehash(&personal_message_hash(message))?;
        sig.v += 27;
        Ok(sig)
    }
}

impl fmt::Debug for SigningAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_recover_prehash() {
        let account = SigningAccount::generate();
        let hash = keccak256(b"payload");
        let sig = account.sign_prehash(&hash).unwrap();
        assert_eq!(recover_address(&hash, &sig).unwrap(), account.address());
    }

    #[test]
    fn test_personal_sign_uses_wallet_v() {
        let account = SigningAccount::generate();
        let sig = account.sign_personal_message(b"abc").unwrap();
        assert!(sig.v == 27 || sig.v == 28);
        assert_eq!(
            recover_personal_signer(b"abc", &sig).unwrap(),
            account.address()
        );
    }

    #[test]
    fn test_wrong_message_recovers_other_address() {
        let account = SigningAccount::generate();
        let sig = account.sign_personal_message(b"nonce-1").unwrap();
        let recovered = recover_personal_signer(b"nonce-2", &sig).unwrap();
        assert_ne!(recovered, account.address());
    }

    #[test]
    fn test_invalid_recovery_id_rejected() {
        let account = SigningAccount::generate();
        let mut sig = account.sign_personal_message(b"abc").unwrap();
        sig.v = 5;
        assert_eq!(
            recover_personal_signer(b"abc", &sig),
            Err(CryptoError::InvalidRecoveryId(5))
        );
    }

    #[test]
    fn test_high_s_rejected() {
        let mut s = [0xFFu8; 32];
        s[0] = 0x80;
        let sig = RecoverableSignature { r: [0x11; 32], s, v: 0 };
        assert_eq!(
            recover_address(&[0u8; 32], &sig),
            Err(CryptoError::MalleableSignature)
        );
    }

    #[test]
    fn test_signature_hex_parse() {
        let account = SigningAccount::generate();
        let sig = account.sign_personal_message(b"abc").unwrap();
        let parsed: RecoverableSignature = sig.to_hex().parse().unwrap();
        assert_eq!(parsed, sig);
        assert!("0x1234".parse::<RecoverableSignature>().is_err());
    }

    /// Well-known development key (Hardhat account #0).
    #[test]
    fn test_known_key_address() {
        let account = SigningAccount::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        assert_eq!(
            account.address().to_checksum(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let account = SigningAccount::from_bytes(&[0x42; 32]).unwrap();
        let dbg = format!("{account:?}");
        assert!(!dbg.contains(&"42".repeat(32)));
    }
}
