//! # CL-04 Credential Lifecycle
//!
//! Issues, revokes and verifies credentials keyed by the SHA-256 fingerprint
//! of their content.
//!
//! ## Storage Modes
//!
//! | Mode | Pointer on the ledger | Limit |
//! |------|-----------------------|-------|
//! | `Embedded` | the raw content | `embedded_limit_bytes` (2 KiB default) and the gas limit |
//! | `External` | content-store identifier | none |
//!
//! ## Error Mapping
//!
//! | Ledger revert | Error |
//! |---------------|-------|
//! | already exists / already revoked | `Conflict` |
//! | does not exist | `NotFound` |
//! | anything else | `Ledger` (classified by the adapter) |
//!
//! ## Outbound Dependencies
//!
//! | Port | Adapters |
//! |------|----------|
//! | `ContentStore` | `IpfsContentStore`, `InMemoryContentStore` |
//! | `TransactionMirror` | `InMemoryMirror` |

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryContentStore, InMemoryMirror, IpfsContentStore};
pub use domain::*;
pub use ports::{ContentStore, ContentStoreStatus, TransactionMirror};
pub use service::{CredentialService, LifecycleConfig, DEFAULT_EMBEDDED_LIMIT_BYTES};
