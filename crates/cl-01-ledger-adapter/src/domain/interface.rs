//! # Contract Interface Descriptor
//!
//! The interface description (a JSON ABI array) is resolved exactly once, at
//! bind time, into a [`ContractInterface`]. Every later call looks functions
//! up by name in the resolved table; optional members are exposed as
//! [`Capabilities`] flags so callers never probe the ledger to find out what
//! the deployed program supports.

use serde::Deserialize;
use shared_types::Bytes32;
use std::collections::HashMap;
use thiserror::Error;

use super::abi::{self, AbiError, ParamType};
use shared_crypto::keccak256;

pub const FN_REGISTER: &str = "registerCredential";
pub const FN_REVOKE: &str = "revokeCredential";
pub const FN_GET: &str = "getCredential";
pub const FN_VERIFY: &str = "verifyCredential";
pub const FN_HAS_ROLE: &str = "hasRole";
pub const FN_GRANT_ROLE: &str = "grantRole";
pub const FN_REVOKE_ROLE: &str = "revokeRole";
pub const EV_REGISTERED: &str = "CredentialRegistered";
pub const EV_REVOKED: &str = "CredentialRevoked";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("interface description is not a valid ABI document: {0}")]
    Malformed(String),

    #[error("required member missing: {0}")]
    MissingMember(String),

    #[error("member {name} has signature {found}, expected {expected}")]
    SignatureMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("member {name}: {source}")]
    UnsupportedType {
        name: String,
        #[source]
        source: AbiError,
    },
}

// =============================================================================
// RAW ABI DOCUMENT
// =============================================================================

#[derive(Debug, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
}

#[derive(Debug, Deserialize)]
struct AbiParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    indexed: bool,
}

fn default_entry_type() -> String {
    "function".to_string()
}

// =============================================================================
// RESOLVED DESCRIPTOR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: String,
    pub signature: String,
    pub selector: [u8; 4],
    pub inputs: Vec<ParamType>,
    pub outputs: Vec<ParamType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub kind: ParamType,
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    pub name: String,
    pub signature: String,
    pub topic: Bytes32,
    pub params: Vec<EventParam>,
}

/// Optional members the deployed program may or may not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// `verifyCredential` with storage-mode aware output.
    pub verify_credential: bool,
    /// `CredentialRevoked` event.
    pub revocation_events: bool,
}

/// Interface generation, derived from capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceVersion {
    /// Registration, lookup and roles only.
    V1,
    /// Adds `verifyCredential` and revocation events.
    V2,
}

#[derive(Debug, Clone)]
pub struct ContractInterface {
    functions: HashMap<String, FunctionSpec>,
    events: HashMap<String, EventSpec>,
    capabilities: Capabilities,
}

struct Expected {
    name: &'static str,
    inputs: &'static [ParamType],
    outputs: &'static [ParamType],
}

const REQUIRED_FUNCTIONS: &[Expected] = &[
    Expected {
        name: FN_REGISTER,
        inputs: &[
            ParamType::Bytes32,
            ParamType::Address,
            ParamType::String,
            ParamType::Uint(8),
        ],
        outputs: &[],
    },
    Expected {
        name: FN_REVOKE,
        inputs: &[ParamType::Bytes32],
        outputs: &[],
    },
    Expected {
        name: FN_GET,
        inputs: &[ParamType::Bytes32],
        outputs: &[
            ParamType::Address,
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::Bool,
            ParamType::String,
        ],
    },
    Expected {
        name: FN_HAS_ROLE,
        inputs: &[ParamType::Bytes32, ParamType::Address],
        outputs: &[ParamType::Bool],
    },
    Expected {
        name: FN_GRANT_ROLE,
        inputs: &[ParamType::Bytes32, ParamType::Address],
        outputs: &[],
    },
    Expected {
        name: FN_REVOKE_ROLE,
        inputs: &[ParamType::Bytes32, ParamType::Address],
        outputs: &[],
    },
];

const VERIFY_FUNCTION: Expected = Expected {
    name: FN_VERIFY,
    inputs: &[ParamType::Bytes32],
    outputs: &[
        ParamType::Bool,
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::String,
        ParamType::Uint(8),
        ParamType::Bytes,
        ParamType::String,
        ParamType::Bool,
    ],
};

const REGISTERED_EVENT: &[ParamType] = &[
    ParamType::Bytes32,
    ParamType::Address,
    ParamType::Address,
    ParamType::String,
];

impl ContractInterface {
    /// Resolve a JSON ABI document.
    pub fn from_json(document: &str) -> Result<Self, InterfaceError> {
        let entries: Vec<AbiEntry> =
            serde_json::from_str(document).map_err(|e| InterfaceError::Malformed(e.to_string()))?;

        let mut functions = HashMap::new();
        let mut events = HashMap::new();

        for entry in entries {
            match entry.kind.as_str() {
                "function" => {
                    let spec = resolve_function(&entry)?;
                    functions.insert(spec.name.clone(), spec);
                }
                "event" => {
                    let spec = resolve_event(&entry)?;
                    events.insert(spec.name.clone(), spec);
                }
                // constructor, fallback, receive, error: irrelevant here
                _ => {}
            }
        }

        for expected in REQUIRED_FUNCTIONS {
            check_function(&functions, expected, true)?;
        }
        let verify_credential = check_function(&functions, &VERIFY_FUNCTION, false)?;

        let registered = events
            .get(EV_REGISTERED)
            .ok_or_else(|| InterfaceError::MissingMember(EV_REGISTERED.to_string()))?;
        check_event_shape(registered, REGISTERED_EVENT)?;

        let revocation_events = match events.get(EV_REVOKED) {
            Some(ev) => {
                if ev.params.first().map(|p| p.kind) != Some(ParamType::Bytes32) {
                    return Err(InterfaceError::SignatureMismatch {
                        name: EV_REVOKED.to_string(),
                        expected: "CredentialRevoked(bytes32,...)".to_string(),
                        found: ev.signature.clone(),
                    });
                }
                true
            }
            None => false,
        };

        Ok(Self {
            functions,
            events,
            capabilities: Capabilities {
                verify_credential,
                revocation_events,
            },
        })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn event(&self, name: &str) -> Option<&EventSpec> {
        self.events.get(name)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn version(&self) -> InterfaceVersion {
        if self.capabilities.verify_credential && self.capabilities.revocation_events {
            InterfaceVersion::V2
        } else {
            InterfaceVersion::V1
        }
    }
}

fn parse_params(name: &str, params: &[AbiParam]) -> Result<Vec<ParamType>, InterfaceError> {
    params
        .iter()
        .map(|p| {
            ParamType::parse(&p.kind).map_err(|source| InterfaceError::UnsupportedType {
                name: name.to_string(),
                source,
            })
        })
        .collect()
}

fn resolve_function(entry: &AbiEntry) -> Result<FunctionSpec, InterfaceError> {
    // Only members the registry client calls must be expressible by the codec.
    let relevant = REQUIRED_FUNCTIONS
        .iter()
        .any(|e| e.name == entry.name)
        || entry.name == FN_VERIFY;

    let (inputs, outputs) = if relevant {
        (
            parse_params(&entry.name, &entry.inputs)?,
            parse_params(&entry.name, &entry.outputs)?,
        )
    } else {
        (
            parse_params(&entry.name, &entry.inputs).unwrap_or_default(),
            Vec::new(),
        )
    };

    let signature = abi::signature(&entry.name, &inputs);
    Ok(FunctionSpec {
        name: entry.name.clone(),
        selector: abi::selector(&signature),
        signature,
        inputs,
        outputs,
    })
}

fn resolve_event(entry: &AbiEntry) -> Result<EventSpec, InterfaceError> {
    let relevant = entry.name == EV_REGISTERED || entry.name == EV_REVOKED;
    let kinds = if relevant {
        parse_params(&entry.name, &entry.inputs)?
    } else {
        parse_params(&entry.name, &entry.inputs).unwrap_or_default()
    };

    let params = entry
        .inputs
        .iter()
        .zip(kinds.iter())
        .map(|(raw, kind)| EventParam {
            name: raw.name.clone(),
            kind: *kind,
            indexed: raw.indexed,
        })
        .collect();

    let signature = abi::signature(&entry.name, &kinds);
    Ok(EventSpec {
        name: entry.name.clone(),
        topic: Bytes32(keccak256(signature.as_bytes())),
        signature,
        params,
    })
}

/// Returns whether the member exists; errors if it exists with the wrong shape
/// or is required and absent.
fn check_function(
    functions: &HashMap<String, FunctionSpec>,
    expected: &Expected,
    required: bool,
) -> Result<bool, InterfaceError> {
    let Some(found) = functions.get(expected.name) else {
        return if required {
            Err(InterfaceError::MissingMember(expected.name.to_string()))
        } else {
            Ok(false)
        };
    };

    let inputs_match = found.inputs == expected.inputs;
    let outputs_match = expected.outputs.is_empty() || found.outputs == expected.outputs;
    if !inputs_match || !outputs_match {
        return Err(InterfaceError::SignatureMismatch {
            name: expected.name.to_string(),
            expected: describe(expected.name, expected.inputs, expected.outputs),
            found: describe(&found.name, &found.inputs, &found.outputs),
        });
    }
    Ok(true)
}

fn check_event_shape(event: &EventSpec, expected: &[ParamType]) -> Result<(), InterfaceError> {
    let kinds: Vec<ParamType> = event.params.iter().map(|p| p.kind).collect();
    if kinds != expected {
        return Err(InterfaceError::SignatureMismatch {
            name: event.name.clone(),
            expected: abi::signature(&event.name, expected),
            found: event.signature.clone(),
        });
    }
    Ok(())
}

fn describe(name: &str, inputs: &[ParamType], outputs: &[ParamType]) -> String {
    if outputs.is_empty() {
        abi::signature(name, inputs)
    } else {
        let outs: Vec<String> = outputs.iter().map(ParamType::canonical_name).collect();
        format!("{} -> ({})", abi::signature(name, inputs), outs.join(","))
    }
}
