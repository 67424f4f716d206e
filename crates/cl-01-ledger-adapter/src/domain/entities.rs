//! Ledger-facing entities: receipts, logs, blocks, decoded registry records.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Bytes32, Fingerprint, StorageMode, TxHash};

/// Read-only call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<Bytes32>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub tx_hash: TxHash,
    pub log_index: u64,
}

/// `eth_getLogs` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: Option<Bytes32>,
    pub from_block: u64,
    /// `None` means latest.
    pub to_block: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub gas_used: u64,
    pub effective_gas_price: U256,
    /// `true` if execution succeeded.
    pub status: bool,
    pub logs: Vec<LogEntry>,
}

impl Receipt {
    /// `gas_used * effective_gas_price`.
    pub fn total_cost(&self) -> U256 {
        U256::from(self.gas_used).saturating_mul(self.effective_gas_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    /// Unix seconds.
    pub timestamp: u64,
}

/// Credential as stored by the registry program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainCredential {
    pub fingerprint: Fingerprint,
    pub issuer: Address,
    pub recipient: Address,
    /// Unix seconds.
    pub issued_at: u64,
    pub storage_mode: StorageMode,
    /// Embedded bytes or the external content identifier.
    pub pointer: Vec<u8>,
    pub is_revoked: bool,
}

impl OnChainCredential {
    /// Valid iff it exists (it does, or we would not hold it) and is not revoked.
    pub fn is_valid(&self) -> bool {
        !self.is_revoked
    }

    /// The pointer as text, for external identifiers.
    pub fn pointer_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.pointer).ok()
    }
}

/// Unsigned transaction for client-side signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub from: Address,
    pub to: Address,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub value: U256,
    pub gas: u64,
    pub gas_price: U256,
    pub nonce: u64,
    pub chain_id: u64,
}

/// Decoded registry event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    Registered {
        fingerprint: Fingerprint,
        issuer: Address,
        recipient: Address,
        pointer: Vec<u8>,
        location: EventLocation,
    },
    Revoked {
        fingerprint: Fingerprint,
        /// Present only if the deployed event carries it.
        actor: Option<Address>,
        location: EventLocation,
    },
}

impl RegistryEvent {
    pub fn location(&self) -> &EventLocation {
        match self {
            RegistryEvent::Registered { location, .. }
            | RegistryEvent::Revoked { location, .. } => location,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            RegistryEvent::Registered { fingerprint, .. }
            | RegistryEvent::Revoked { fingerprint, .. } => *fingerprint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventLocation {
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: TxHash,
}

/// Whether a pointer has the shape of a content-store identifier
/// (CIDv0 `Qm...` of 46+ chars, or CIDv1 base32 `bafy...`).
pub fn looks_like_content_id(pointer: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(pointer) else {
        return false;
    };
    (text.starts_with("Qm") && text.len() >= 46) || (text.starts_with("bafy") && text.len() >= 59)
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        hex::decode(raw.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_shapes() {
        assert!(looks_like_content_id(
            b"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        ));
        assert!(!looks_like_content_id(b"Qm-short"));
        assert!(!looks_like_content_id(b"DIPLOMA-1"));
        assert!(!looks_like_content_id(&[0xff, 0xfe]));
    }

    #[test]
    fn test_receipt_cost() {
        let r = Receipt {
            tx_hash: Bytes32::ZERO,
            block_number: 1,
            from: Address::ZERO,
            to: None,
            gas_used: 50_000,
            effective_gas_price: U256::from(2_000_000_000u64),
            status: true,
            logs: vec![],
        };
        assert_eq!(r.total_cost(), U256::from(100_000_000_000_000u64));
    }
}
