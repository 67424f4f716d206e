//! # Adapters Layer (Outer Hexagon)
//!
//! - `json_rpc`: HTTP JSON-RPC node client (reqwest)
//! - `artifacts`: filesystem and static deployment artifacts
//! - `in_memory_ledger`: native execution of the registry program for tests
//!   and dev mode

pub mod artifacts;
pub mod in_memory_ledger;
pub mod json_rpc;

pub use artifacts::{FsArtifactSource, StaticArtifacts};
pub use in_memory_ledger::{InMemoryConnector, InMemoryLedger, CREDENTIAL_REGISTRY_ABI};
pub use json_rpc::{HttpConnector, JsonRpcClient};
