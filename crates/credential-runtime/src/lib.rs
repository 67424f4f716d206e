//! # Credential Runtime Library
//!
//! Composition root for the credential ledger. The `credential-runtime`
//! binary is a thin operator CLI over [`ServiceContainer`].
//!
//! ## Modes
//!
//! - **Connected**: JSON-RPC node and IPFS API from `CL_*` variables
//! - **Development** (`--dev`): in-memory ledger and content store

#![warn(clippy::all)]

pub mod container;
pub mod health;

pub use container::{ConfigError, RuntimeConfig, RuntimeError, ServiceContainer};
pub use health::{HealthReport, SignerHealth};
