//! # Core Entities
//!
//! Fixed-width ledger primitives shared by every subsystem.
//!
//! ## Display Conventions
//!
//! - `Debug` prints the full `0x`-prefixed lowercase hex value.
//! - `Display` prints the same full value; addresses and fingerprints are
//!   short enough that truncation only hurts log correlation.
//! - Serde uses the `0x`-prefixed hex string form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;

/// Decodes a hex string (with or without `0x`) into a fixed-size array.
pub fn parse_hex_array<const N: usize>(input: &str) -> Result<[u8; N], ParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != N * 2 {
        return Err(ParseError::InvalidLength {
            expected: N,
            actual: digits.len() / 2,
        });
    }

    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    Ok(out)
}

// =============================================================================
// ADDRESS
// =============================================================================

/// 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. The registry program uses it to mean "no record".
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Builds an address from the trailing 20 bytes of a 32-byte word.
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&word[12..]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase hex form, used as the canonical map key for challenges.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Mixed-case checksum encoding (EIP-55).
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = Keccak256::digest(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (digest[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = ParseError;

    /// Case-insensitive parse; checksum casing is accepted but not enforced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array::<20>(s).map(Address)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_lower_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lower_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// BYTES32
// =============================================================================

/// Opaque 32-byte word: transaction hashes, role identifiers, log topics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Bytes32(pub [u8; 32]);

/// Transaction hash.
pub type TxHash = Bytes32;

/// On-ledger role identifier (`keccak256` of the role name).
pub type RoleId = Bytes32;

impl Bytes32 {
    pub const ZERO: Bytes32 = Bytes32([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Bytes32 {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array::<32>(s).map(Bytes32)
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes32({})", self.to_hex())
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for Bytes32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// FINGERPRINT
// =============================================================================

/// SHA-256 digest of a credential's raw content; the ledger's primary key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Fingerprint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array::<32>(s).map(Fingerprint)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Fingerprint> for Bytes32 {
    fn from(fp: Fingerprint) -> Self {
        Bytes32(fp.0)
    }
}

impl From<Bytes32> for Fingerprint {
    fn from(word: Bytes32) -> Self {
        Fingerprint(word.0)
    }
}

// =============================================================================
// SERDE (hex strings)
// =============================================================================

macro_rules! impl_hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_hex_serde!(Address);
impl_hex_serde!(Bytes32);
impl_hex_serde!(Fingerprint);

// =============================================================================
// STORAGE MODE
// =============================================================================

/// Where a credential's content lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Raw bytes travel inside the registration transaction.
    Embedded,
    /// Only a content-store pointer is recorded on the ledger.
    External,
}

impl StorageMode {
    /// Wire value of the `storageMode` uint8 argument.
    pub fn as_u8(self) -> u8 {
        match self {
            StorageMode::Embedded => 0,
            StorageMode::External => 1,
        }
    }

    /// The registry program treats every non-zero value as external.
    pub fn from_u8(value: u8) -> Self {
        if value == 0 {
            StorageMode::Embedded
        } else {
            StorageMode::External
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Embedded => f.write_str("embedded"),
            StorageMode::External => f.write_str("external"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_is_case_insensitive() {
        let lower: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        let mixed: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_address_parse_without_prefix() {
        let a: Address = "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(a.0[0], 0x5a);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidLength { expected: 20, .. }));
    }

    /// Reference vector from EIP-55.
    #[test]
    fn test_checksum_encoding() {
        let a: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(a.to_checksum(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_address_from_word_takes_low_bytes() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xAB; 20]);
        assert_eq!(Address::from_word(&word), Address([0xAB; 20]));
    }

    #[test]
    fn test_fingerprint_serde_uses_hex_string() {
        let fp = Fingerprint([0x11; 32]);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "11".repeat(32)));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_storage_mode_wire_values() {
        assert_eq!(StorageMode::Embedded.as_u8(), 0);
        assert_eq!(StorageMode::External.as_u8(), 1);
        assert_eq!(StorageMode::from_u8(7), StorageMode::External);
    }
}
