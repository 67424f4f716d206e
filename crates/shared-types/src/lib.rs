//! # Shared Types Crate
//!
//! Types every credential subsystem agrees on: ledger primitives, the fixed
//! role set, the authenticated session, the time source and the shared error
//! taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types are defined here once.
//! - **Ledger is authoritative**: nothing in this crate caches ledger state.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod roles;
pub mod security;
pub mod session;

pub use clock::*;
pub use entities::*;
pub use errors::*;
pub use roles::*;
pub use security::*;
pub use session::Session;
