//! # Runtime Configuration
//!
//! Unified configuration for every subsystem, loaded from `CL_*` environment
//! variables.
//!
//! ## Security Requirements
//!
//! - `session_secret` MUST NOT be the default zero value in production
//! - at least one signing key MUST be configured in production
//! - the largest Embedded registration MUST fit in the gas limit
//! - all timeouts and limits have sane defaults with override capability

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use cl_01_ledger_adapter::domain::gas;
use cl_01_ledger_adapter::{AdapterConfig, SubmitConfig};
use cl_03_identity_binding::domain::DEFAULT_CHALLENGE_TTL_SECS;
use cl_03_identity_binding::{IdentityConfig, DEFAULT_SESSION_TTL_SECS};
use cl_04_credential_lifecycle::{LifecycleConfig, DEFAULT_EMBEDDED_LIMIT_BYTES};
use cl_05_audit_projection::{AuditConfig, DEFAULT_RECENT_WINDOW};
use thiserror::Error;
use zeroize::Zeroizing;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Ledger endpoint, artifacts and submission tuning.
    pub ledger: LedgerSettings,
    /// Server-held signing keys.
    pub signing: SigningSettings,
    /// Content-addressed store.
    pub content_store: ContentStoreSettings,
    /// Challenge and session parameters.
    pub identity: IdentitySettings,
    /// Issuance parameters.
    pub lifecycle: LifecycleSettings,
    /// Audit and dashboard parameters.
    pub audit: AuditSettings,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Session secret is not set (zero value).
    #[error(
        "SECURITY VIOLATION: session secret is default zero value. \
         Set CL_SESSION_SECRET environment variable."
    )]
    InsecureSessionSecret,

    /// No signing keys configured.
    #[error("no signing keys configured; set CL_SIGNER_KEYS")]
    NoSigners,

    /// An Embedded payload at the configured limit could not be registered
    /// within the configured gas limit.
    #[error(
        "embedded limit of {limit_bytes} bytes needs up to {required_gas} gas, \
         above CL_GAS_LIMIT={gas_limit}"
    )]
    EmbeddedLimitExceedsGas {
        limit_bytes: usize,
        required_gas: u64,
        gas_limit: u64,
    },

    /// A variable is present but cannot be parsed.
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup. Unset variables
    /// keep their defaults; set but malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CL_LEDGER_RPC_URL") {
            config.ledger.rpc_url = url;
        }
        if let Some(dir) = lookup("CL_ARTIFACT_DIR") {
            config.ledger.artifact_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("CL_CONTRACT_NAME") {
            config.ledger.contract_name = name;
        }
        if let Some(v) = lookup("CL_GAS_LIMIT") {
            config.ledger.gas_limit = parse_num("CL_GAS_LIMIT", &v)?;
        }
        if let Some(v) = lookup("CL_RECEIPT_POLL_MS") {
            config.ledger.receipt_poll_ms = parse_num("CL_RECEIPT_POLL_MS", &v)?;
        }
        if let Some(v) = lookup("CL_RECEIPT_TIMEOUT_SECS") {
            config.ledger.receipt_timeout_secs = Some(parse_num("CL_RECEIPT_TIMEOUT_SECS", &v)?);
        }

        if let Some(keys) = lookup("CL_SIGNER_KEYS") {
            config.signing.keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| Zeroizing::new(k.to_string()))
                .collect();
        }

        if let Some(url) = lookup("CL_CONTENT_STORE_URL") {
            config.content_store.api_url = url;
        }

        if let Some(secret_hex) = lookup("CL_SESSION_SECRET") {
            let bytes = Zeroizing::new(hex::decode(secret_hex.trim_start_matches("0x")).map_err(
                |e| ConfigError::Invalid {
                    var: "CL_SESSION_SECRET",
                    reason: e.to_string(),
                },
            )?);
            if bytes.len() != 32 {
                return Err(ConfigError::Invalid {
                    var: "CL_SESSION_SECRET",
                    reason: "must be 32 bytes (64 hex chars)".to_string(),
                });
            }
            config.identity.session_secret.copy_from_slice(&bytes);
        }
        if let Some(v) = lookup("CL_SESSION_TTL_SECS") {
            config.identity.session_ttl_secs = parse_num("CL_SESSION_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("CL_CHALLENGE_TTL_SECS") {
            config.identity.challenge_ttl_secs = parse_num("CL_CHALLENGE_TTL_SECS", &v)?;
        }

        if let Some(v) = lookup("CL_EMBEDDED_LIMIT_BYTES") {
            config.lifecycle.embedded_limit_bytes = parse_num("CL_EMBEDDED_LIMIT_BYTES", &v)?;
        }
        if let Some(v) = lookup("CL_RECENT_WINDOW") {
            config.audit.recent_window = parse_num("CL_RECENT_WINDOW", &v)?;
        }

        Ok(config)
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the session secret is the default zero value
    /// - no signing key is configured
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if *self.identity.session_secret == [0u8; 32] {
            return Err(ConfigError::InsecureSessionSecret);
        }
        if self.signing.keys.is_empty() {
            return Err(ConfigError::NoSigners);
        }
        let required_gas = gas::registration_upper_bound(self.lifecycle.embedded_limit_bytes);
        if required_gas > self.ledger.gas_limit {
            return Err(ConfigError::EmbeddedLimitExceedsGas {
                limit_bytes: self.lifecycle.embedded_limit_bytes,
                required_gas,
                gas_limit: self.ledger.gas_limit,
            });
        }
        Ok(())
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            endpoint: self.ledger.rpc_url.clone(),
            submit: SubmitConfig {
                gas_limit: self.ledger.gas_limit,
                receipt_poll_interval: Duration::from_millis(self.ledger.receipt_poll_ms),
                receipt_timeout: self.ledger.receipt_timeout_secs.map(Duration::from_secs),
            },
        }
    }

    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            challenge_ttl_secs: self.identity.challenge_ttl_secs,
            session_ttl_secs: self.identity.session_ttl_secs,
            session_secret: self.identity.session_secret.to_vec(),
        }
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            embedded_limit_bytes: self.lifecycle.embedded_limit_bytes,
        }
    }
}

fn parse_num<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Directory holding the interface document and address marker.
    pub artifact_dir: PathBuf,
    /// Artifact base name.
    pub contract_name: String,
    /// Gas limit for every submitted transaction.
    pub gas_limit: u64,
    /// Receipt polling interval in milliseconds.
    pub receipt_poll_ms: u64,
    /// `None` waits for receipts indefinitely.
    pub receipt_timeout_secs: Option<u64>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        let submit = SubmitConfig::default();
        Self {
            rpc_url: AdapterConfig::default().endpoint,
            artifact_dir: PathBuf::from("contracts"),
            contract_name: "CredentialRegistry".to_string(),
            gas_limit: submit.gas_limit,
            receipt_poll_ms: submit.receipt_poll_interval.as_millis() as u64,
            receipt_timeout_secs: None,
        }
    }
}

/// Signing keys, hex encoded. Never printed.
#[derive(Clone, Default)]
pub struct SigningSettings {
    pub keys: Vec<Zeroizing<String>>,
}

impl fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSettings")
            .field("keys", &format_args!("<{} redacted>", self.keys.len()))
            .finish()
    }
}

/// Content store configuration.
#[derive(Debug, Clone)]
pub struct ContentStoreSettings {
    /// IPFS HTTP API base URL.
    pub api_url: String,
}

impl Default for ContentStoreSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5001".to_string(),
        }
    }
}

/// Identity configuration.
#[derive(Clone)]
pub struct IdentitySettings {
    /// HMAC key for session tokens (32 bytes).
    /// MUST NOT be default in production.
    pub session_secret: Zeroizing<[u8; 32]>,
    pub session_ttl_secs: u64,
    pub challenge_ttl_secs: u64,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            session_secret: Zeroizing::new([0u8; 32]), // MUST be overridden in production
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            challenge_ttl_secs: DEFAULT_CHALLENGE_TTL_SECS,
        }
    }
}

impl fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("session_secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .finish()
    }
}

/// Issuance configuration.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Largest payload stored inline on the ledger.
    pub embedded_limit_bytes: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            embedded_limit_bytes: DEFAULT_EMBEDDED_LIMIT_BYTES,
        }
    }
}

/// Audit configuration.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    /// Size of the recent-registrations window.
    pub recent_window: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
        }
    }
}

impl AuditSettings {
    pub fn to_audit_config(&self, signer: Option<shared_types::Address>) -> AuditConfig {
        AuditConfig {
            recent_window: self.recent_window,
            signer,
        }
    }
}
