//! # Legacy Transactions (EIP-155)
//!
//! `rlp([nonce, gasPrice, gas, to, value, data, v, r, s])` with
//! `v = chainId * 2 + 35 + parity`. The signing hash is
//! `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`.

use primitive_types::U256;
use rlp::{DecoderError, Rlp, RlpStream};
use shared_crypto::{keccak256, recover_address, CryptoError, RecoverableSignature, SigningAccount};
use shared_types::{Address, Bytes32, TxHash};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("rlp: {0}")]
    Rlp(String),

    #[error("expected 9 fields, got {0}")]
    FieldCount(usize),

    #[error("unprotected or malformed v value {0}")]
    InvalidV(u64),

    #[error("invalid recipient length {0}")]
    InvalidRecipient(usize),

    #[error("signature: {0}")]
    Signature(#[from] CryptoError),
}

impl From<DecoderError> for TransactionError {
    fn from(e: DecoderError) -> Self {
        TransactionError::Rlp(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// A signed, encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: TxHash,
}

/// Result of decoding a raw transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub tx: LegacyTransaction,
    pub sender: Address,
    pub hash: TxHash,
}

impl LegacyTransaction {
    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(to) => stream.append(&to.0.to_vec()),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data);
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(&stream.out())
    }

    pub fn sign(&self, signer: &SigningAccount) -> Result<SignedTransaction, CryptoError> {
        let sig = signer.sign_prehash(&self.signing_hash())?;
        let v = self.chain_id * 2 + 35 + u64::from(sig.v);

        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        stream.append(&U256::from_big_endian(&sig.r));
        stream.append(&U256::from_big_endian(&sig.s));

        let raw = stream.out().to_vec();
        let hash = Bytes32(keccak256(&raw));
        Ok(SignedTransaction { raw, hash })
    }
}

/// Decode a raw EIP-155 transaction and recover its sender.
pub fn decode_signed(raw: &[u8]) -> Result<DecodedTransaction, TransactionError> {
    let rlp = Rlp::new(raw);
    let count = rlp.item_count()?;
    if count != 9 {
        return Err(TransactionError::FieldCount(count));
    }

    let to_bytes: Vec<u8> = rlp.val_at(3)?;
    let to = match to_bytes.len() {
        0 => None,
        20 => {
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&to_bytes);
            Some(Address(addr))
        }
        n => return Err(TransactionError::InvalidRecipient(n)),
    };

    let v: u64 = rlp.val_at(6)?;
    if v < 35 {
        return Err(TransactionError::InvalidV(v));
    }
    let chain_id = (v - 35) / 2;
    let parity = ((v - 35) % 2) as u8;

    let tx = LegacyTransaction {
        nonce: rlp.val_at(0)?,
        gas_price: rlp.val_at(1)?,
        gas_limit: rlp.val_at(2)?,
        to,
        value: rlp.val_at(4)?,
        data: rlp.val_at(5)?,
        chain_id,
    };

    let r: U256 = rlp.val_at(7)?;
    let s: U256 = rlp.val_at(8)?;
    let mut sig = RecoverableSignature {
        r: [0u8; 32],
        s: [0u8; 32],
        v: parity,
    };
    r.to_big_endian(&mut sig.r);
    s.to_big_endian(&mut sig.s);

    let sender = recover_address(&tx.signing_hash(), &sig)?;
    Ok(DecodedTransaction {
        tx,
        sender,
        hash: Bytes32(keccak256(raw)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(chain_id: u64) -> LegacyTransaction {
        LegacyTransaction {
            nonce: 7,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 2_000_000,
            to: Some(Address([0x42; 20])),
            value: U256::zero(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
            chain_id,
        }
    }

    #[test]
    fn test_signed_transaction_recovers_sender() {
        let signer = SigningAccount::generate();
        let signed = sample(1337).sign(&signer).unwrap();

        let decoded = decode_signed(&signed.raw).unwrap();
        assert_eq!(decoded.sender, signer.address());
        assert_eq!(decoded.tx, sample(1337));
        assert_eq!(decoded.hash, signed.hash);
    }

    /// Reference vector from EIP-155.
    #[test]
    fn test_eip155_signing_hash_vector() {
        let tx = LegacyTransaction {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: 21_000,
            to: Some("0x3535353535353535353535353535353535353535".parse().unwrap()),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: vec![],
            chain_id: 1,
        };
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_vector() {
        let signer = SigningAccount::from_bytes(&[0x46; 32]).unwrap();
        let tx = LegacyTransaction {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: 21_000,
            to: Some("0x3535353535353535353535353535353535353535".parse().unwrap()),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: vec![],
            chain_id: 1,
        };
        let signed = tx.sign(&signer).unwrap();
        assert_eq!(
            hex::encode(&signed.raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_unprotected_v_rejected() {
        let mut stream = RlpStream::new_list(9);
        sample(1).append_body(&mut stream);
        stream.append(&27u64);
        stream.append(&U256::one());
        stream.append(&U256::one());
        assert_eq!(
            decode_signed(&stream.out()).unwrap_err(),
            TransactionError::InvalidV(27)
        );
    }

    #[test]
    fn test_truncated_list_rejected() {
        let mut stream = RlpStream::new_list(2);
        stream.append(&1u64);
        stream.append(&2u64);
        assert_eq!(
            decode_signed(&stream.out()).unwrap_err(),
            TransactionError::FieldCount(2)
        );
    }
}
