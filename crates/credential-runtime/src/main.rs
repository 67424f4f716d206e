//! # Credential Runtime
//!
//! Operator CLI for the credential ledger.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (`CL_LOG_LEVEL`, `CL_JSON_LOGS`, ...)
//! 2. Load configuration from `CL_*` variables
//! 3. Validate for production unless `--dev`
//! 4. Wire the service container (cl-01 → cl-05)
//! 5. Run one command and print JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use credential_runtime::{HealthReport, RuntimeConfig, ServiceContainer};
use credential_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use shared_types::{Address, Fingerprint};

/// Credential ledger operator CLI
#[derive(Parser, Debug)]
#[command(name = "credential-runtime")]
#[command(about = "Inspect and verify credentials anchored on the ledger")]
struct Args {
    /// Use an in-memory ledger and content store
    #[arg(long, env = "CL_DEV_MODE")]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adapter binding, node and content-store liveness, signer balances
    Status,

    /// Look up a credential by its 32-byte hex fingerprint
    Verify {
        fingerprint: Fingerprint,
    },

    /// Registration and revocation history
    Audit {
        /// Rebuild from genesis instead of the incremental projection
        #[arg(long)]
        full: bool,

        /// Only credentials issued to this address
        #[arg(long, conflicts_with = "full")]
        recipient: Option<Address>,
    },

    /// Prometheus metrics in text exposition format
    Metrics,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("invalid configuration")?;
    let container = if args.dev {
        ServiceContainer::in_memory(config).await?
    } else {
        config.validate_for_production()?;
        ServiceContainer::connect(config).await?
    };
    info!(dev = args.dev, "credential runtime ready");

    match args.command {
        Command::Status => print_json(&HealthReport::collect(&container).await)?,
        Command::Verify { fingerprint } => {
            let verification = container
                .credentials
                .verify(fingerprint)
                .await
                .with_context(|| format!("verification of {fingerprint} failed"))?;
            print_json(&verification)?;
        }
        Command::Audit {
            full: true,
            recipient: _,
        } => print_json(&container.audit.replay_full().await?)?,
        Command::Audit {
            full: false,
            recipient: Some(recipient),
        } => print_json(&container.audit.credentials_for_recipient(recipient).await?)?,
        Command::Audit {
            full: false,
            recipient: None,
        } => print_json(&container.audit.dashboard().await)?,
        Command::Metrics => print!("{}", encode_metrics()?),
    }

    Ok(())
}
