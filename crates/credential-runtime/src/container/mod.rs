//! # Service Container
//!
//! Holds every credential subsystem and the infrastructure they share.
//!
//! ## Wiring Order
//!
//! ```text
//! Level 0: clock, keyring, content store, mirror
//! Level 1: Ledger Adapter (cl-01), refreshed once
//! Level 2: Access Control (cl-02)
//! Level 3: Identity Binding (cl-03), Credential Lifecycle (cl-04), Audit (cl-05)
//! ```

pub mod config;
pub mod services;

pub use config::{
    AuditSettings, ConfigError, ContentStoreSettings, IdentitySettings, LedgerSettings,
    LifecycleSettings, RuntimeConfig, SigningSettings,
};
pub use services::{RuntimeError, ServiceContainer};
