//! # CL-03 Identity Binding
//!
//! Proves that a caller controls an address by having it sign a one-time
//! nonce, then mints a signed session carrying the roles the ledger reports.
//!
//! ## Flow
//!
//! 1. `get_challenge(address)`: 32-char alphanumeric nonce, 300 s TTL, one per
//!    address (re-requesting overwrites).
//! 2. `verify(address, signature)`: recover the EIP-191 personal-message
//!    signer, compare, consume the nonce, resolve roles, mint a token.
//! 3. `authenticate(token)`: check MAC and expiry, return the `Session`.
//!
//! ## Role Policy
//!
//! Only roles the ledger confirms are placed in a session. `Student` is
//! implied when every role is definitively absent. If no role could be
//! checked at all, login fails with a connection error.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryIdentityStore;
pub use domain::{Challenge, Identity, IdentityError, SessionCodec};
pub use ports::{IdentityStore, RoleResolver};
pub use service::{IdentityConfig, IdentityService, Login, DEFAULT_SESSION_TTL_SECS};
