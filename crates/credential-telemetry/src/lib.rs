//! # Credential Telemetry
//!
//! Logging and metrics shared by every credential subsystem.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events, formatted by `tracing-subscriber` as JSON
//!   (containers) or human-readable text (development)
//! - **Metrics**: Prometheus counters, gauges and histograms in one registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use credential_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CL_SERVICE_NAME` | `credential-ledger` | Service name in logs |
//! | `CL_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `CL_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `CL_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `CL_NETWORK` | `devnet` | Deployment label |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, AUDIT_REPLAY_DURATION, AUTH_ATTEMPTS, CHALLENGES_ISSUED,
    CREDENTIALS_ISSUED, CREDENTIALS_REVOKED, LEDGER_GAS_USED, LEDGER_RECEIPT_WAIT,
    LEDGER_TRANSACTIONS, LIFECYCLE_FAILURES, ORPHANED_UPLOADS, PROJECTION_HEIGHT, ROLE_CHANGES,
    ROLE_CHECKS_UNKNOWN,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global tracing subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    tracing_setup::init_tracing(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}
