//! # CL-01 Ledger Adapter
//!
//! Connection, artifact and binding lifecycle for the credential registry
//! program, plus everything needed to talk to it: the ABI codec, legacy
//! transaction signing, a per-account sequencer and event decoding.
//!
//! ## Lifecycle
//!
//! | Step | Method | On failure |
//! |------|--------|------------|
//! | Connect | `LedgerAdapter::connect` | error recorded, `NotConnected` |
//! | Load interface | `LedgerAdapter::load_interface` | error recorded |
//! | Load address | `LedgerAdapter::load_address` | error recorded |
//! | Bind | `LedgerAdapter::bind` | no handle, `Unavailable` |
//!
//! `refresh()` composes all four and never fails. `get_handle()` returns the
//! bound [`ContractHandle`] or `None`.
//!
//! ## Outbound Dependencies
//!
//! | Port | Adapters |
//! |------|----------|
//! | `LedgerRpc` / `RpcConnector` | `JsonRpcClient` / `HttpConnector`, `InMemoryLedger` |
//! | `ArtifactSource` | `FsArtifactSource`, `StaticArtifacts` |
//! | `SignerProvider` | `shared_crypto::Keyring` |

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod handle;
pub mod ports;
pub mod sequencer;
pub mod service;

pub use domain::*;
pub use handle::ContractHandle;
pub use ports::{ArtifactSource, LedgerRpc, RpcConnector, SignerProvider};
pub use sequencer::{AccountSequencer, SubmitConfig, TransactionSubmitter};
pub use service::{AdapterConfig, AdapterStatus, LedgerAdapter, NodeHealth};
