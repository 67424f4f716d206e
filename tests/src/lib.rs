//! # Credential Ledger Scenario Tests
//!
//! Cross-subsystem flows against the in-memory ledger.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # World: every service over one in-memory ledger
//! └── integration/
//!     ├── identity_flow.rs    # challenge, sign, verify, session
//!     ├── credential_flow.rs  # issue, verify, revoke
//!     ├── role_flow.rs        # grant / revoke round trips
//!     ├── adapter_flow.rs     # artifacts appearing after startup
//!     └── audit_flow.rs       # projection against full replay
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cl-tests
//! cargo test -p cl-tests integration::credential_flow
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
