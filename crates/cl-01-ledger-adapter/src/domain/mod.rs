//! # Domain Layer (Inner Hexagon)
//!
//! Pure ledger concepts: the ABI codec, the resolved interface descriptor,
//! legacy transaction encoding, the gas schedule and revert classification.
//! NO I/O, NO async.

pub mod abi;
pub mod entities;
pub mod errors;
pub mod gas;
pub mod interface;
pub mod revert;
pub mod transaction;

pub use entities::*;
pub use errors::*;
pub use interface::{Capabilities, ContractInterface, InterfaceError, InterfaceVersion};
pub use revert::{normalize_reason, RevertKind};
pub use transaction::{decode_signed, LegacyTransaction, SignedTransaction, TransactionError};
