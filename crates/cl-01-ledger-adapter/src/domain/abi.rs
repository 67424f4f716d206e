//! # Contract ABI Codec
//!
//! Head/tail encoding for the parameter types the registry interface uses.
//! Only what the credential program needs is supported; anything else is
//! rejected at interface resolution time, not at call time.
//!
//! `string` and `bytes` share a wire encoding, so both decode to raw bytes.
//! Embedded credential content travels in the `string` pointer slot
//! unchanged.

use primitive_types::U256;
use shared_types::Address;
use thiserror::Error;

use shared_crypto::keccak256;

const WORD: usize = 32;

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("unsupported parameter type: {0}")]
    UnsupportedType(String),

    #[error("output too short: need {needed} bytes at offset {offset}, have {available}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("token does not match parameter type {expected}")]
    TypeMismatch { expected: String },

    #[error("value does not fit in {bits} bits")]
    Overflow { bits: usize },

    #[error("argument count mismatch: expected {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
}

/// Parameter types understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    Bytes32,
    /// `uintN`; N in bits.
    Uint(usize),
    Bool,
    String,
    Bytes,
}

impl ParamType {
    /// Parse a canonical ABI type name.
    pub fn parse(name: &str) -> Result<Self, AbiError> {
        match name {
            "address" => Ok(ParamType::Address),
            "bytes32" => Ok(ParamType::Bytes32),
            "bool" => Ok(ParamType::Bool),
            "string" => Ok(ParamType::String),
            "bytes" => Ok(ParamType::Bytes),
            "uint" => Ok(ParamType::Uint(256)),
            other => {
                let bits = other
                    .strip_prefix("uint")
                    .and_then(|b| b.parse::<usize>().ok())
                    .filter(|b| *b > 0 && *b <= 256 && b % 8 == 0)
                    .ok_or_else(|| AbiError::UnsupportedType(other.to_string()))?;
                Ok(ParamType::Uint(bits))
            }
        }
    }

    pub fn canonical_name(&self) -> String {
        match self {
            ParamType::Address => "address".to_string(),
            ParamType::Bytes32 => "bytes32".to_string(),
            ParamType::Uint(bits) => format!("uint{bits}"),
            ParamType::Bool => "bool".to_string(),
            ParamType::String => "string".to_string(),
            ParamType::Bytes => "bytes".to_string(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParamType::String | ParamType::Bytes)
    }
}

/// A decoded or to-be-encoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Bytes32([u8; 32]),
    Uint(U256),
    Bool(bool),
    /// `string` or `bytes` payload.
    Bytes(Vec<u8>),
}

impl Token {
    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_bytes32(self) -> Option<[u8; 32]> {
        match self {
            Token::Bytes32(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Token::Bytes(b) => Some(b),
            _ => None,
        }
    }

    fn matches(&self, kind: &ParamType) -> bool {
        matches!(
            (self, kind),
            (Token::Address(_), ParamType::Address)
                | (Token::Bytes32(_), ParamType::Bytes32)
                | (Token::Uint(_), ParamType::Uint(_))
                | (Token::Bool(_), ParamType::Bool)
                | (Token::Bytes(_), ParamType::String | ParamType::Bytes)
        )
    }
}

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Build a canonical signature string, e.g. `hasRole(bytes32,address)`.
pub fn signature(name: &str, params: &[ParamType]) -> String {
    let args: Vec<String> = params.iter().map(ParamType::canonical_name).collect();
    format!("{}({})", name, args.join(","))
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode `tokens` against `types` (checked) without a selector.
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
    if types.len() != tokens.len() {
        return Err(AbiError::ArityMismatch {
            expected: types.len(),
            actual: tokens.len(),
        });
    }

    let head_len = types.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (kind, token) in types.iter().zip(tokens) {
        if !token.matches(kind) {
            return Err(AbiError::TypeMismatch {
                expected: kind.canonical_name(),
            });
        }
        match token {
            Token::Address(a) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(a.as_bytes());
                head.extend_from_slice(&word);
            }
            Token::Bytes32(b) => head.extend_from_slice(b),
            Token::Uint(v) => {
                if let ParamType::Uint(bits) = kind {
                    if *bits < 256 && v.bits() > *bits {
                        return Err(AbiError::Overflow { bits: *bits });
                    }
                }
                head.extend_from_slice(&u256_word(*v));
            }
            Token::Bool(b) => head.extend_from_slice(&u256_word(U256::from(u8::from(*b)))),
            Token::Bytes(bytes) => {
                head.extend_from_slice(&u256_word(U256::from(head_len + tail.len())));
                tail.extend_from_slice(&u256_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let pad = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(pad));
            }
        }
    }

    head.extend_from_slice(&tail);
    Ok(head)
}

/// Encode a call: selector followed by the arguments.
pub fn encode_call(
    selector: [u8; 4],
    types: &[ParamType],
    tokens: &[Token],
) -> Result<Vec<u8>, AbiError> {
    let mut out = selector.to_vec();
    out.extend(encode(types, tokens)?);
    Ok(out)
}

fn u256_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode return data or log data into tokens.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut out = Vec::with_capacity(types.len());
    for (i, kind) in types.iter().enumerate() {
        let word = read_word(data, i * WORD)?;
        out.push(decode_word(kind, &word, data)?);
    }
    Ok(out)
}

/// Decode a single static value from a log topic.
pub fn decode_topic(kind: &ParamType, topic: &[u8; 32]) -> Result<Token, AbiError> {
    if kind.is_dynamic() {
        // Indexed dynamic values are stored as their hash.
        return Ok(Token::Bytes32(*topic));
    }
    decode_word(kind, topic, &[])
}

fn decode_word(kind: &ParamType, word: &[u8; WORD], data: &[u8]) -> Result<Token, AbiError> {
    match kind {
        ParamType::Address => Ok(Token::Address(Address::from_word(word))),
        ParamType::Bytes32 => Ok(Token::Bytes32(*word)),
        ParamType::Uint(bits) => {
            let value = U256::from_big_endian(word);
            if *bits < 256 && value.bits() > *bits {
                return Err(AbiError::Overflow { bits: *bits });
            }
            Ok(Token::Uint(value))
        }
        ParamType::Bool => Ok(Token::Bool(word[WORD - 1] != 0)),
        ParamType::String | ParamType::Bytes => {
            let offset = word_to_usize(word, data.len())?;
            let len_word = read_word(data, offset)?;
            let len = word_to_usize(&len_word, data.len())?;
            let start = offset + WORD;
            let end = start.checked_add(len).ok_or(AbiError::OutOfBounds {
                offset: start,
                needed: len,
                available: data.len(),
            })?;
            if end > data.len() {
                return Err(AbiError::OutOfBounds {
                    offset: start,
                    needed: len,
                    available: data.len(),
                });
            }
            Ok(Token::Bytes(data[start..end].to_vec()))
        }
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; WORD], AbiError> {
    let end = offset.checked_add(WORD).unwrap_or(usize::MAX);
    if end > data.len() {
        return Err(AbiError::OutOfBounds {
            offset,
            needed: WORD,
            available: data.len(),
        });
    }
    let mut word = [0u8; WORD];
    word.copy_from_slice(&data[offset..end]);
    Ok(word)
}

fn word_to_usize(word: &[u8; WORD], limit: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(word);
    if value > U256::from(limit) {
        return Err(AbiError::OutOfBounds {
            offset: limit,
            needed: value.low_u64() as usize,
            available: limit,
        });
    }
    Ok(value.as_usize())
}

/// Extract the message of an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    let tokens = decode(&[ParamType::String], &data[4..]).ok()?;
    tokens
        .into_iter()
        .next()
        .and_then(Token::into_bytes)
        .map(|b| String::from_utf8_lossy(&b).into_owned())
}

/// Build an `Error(string)` revert payload.
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    // A single string token always matches its type.
    encode_call(
        ERROR_STRING_SELECTOR,
        &[ParamType::String],
        &[Token::Bytes(reason.as_bytes().to_vec())],
    )
    .unwrap_or_default()
}
