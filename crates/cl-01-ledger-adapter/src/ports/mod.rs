//! # Ports Layer (Middle Hexagon)
//!
//! - **Driven Ports (Outbound)**: `LedgerRpc`, `RpcConnector`, `ArtifactSource`,
//!   `SignerProvider`
//! - No concrete implementations in this module

pub mod outbound;

pub use outbound::*;
