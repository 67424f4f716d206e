//! Prometheus metrics for the credential subsystems.
//!
//! All metrics follow the naming convention: `cl_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g. credentials_issued_total)
//! - **Gauge**: Value that can go up or down (e.g. projection_height)
//! - **Histogram**: Distribution of values (e.g. audit_replay_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LEDGER ADAPTER (cl-01)
    // =========================================================================

    /// Submitted ledger transactions by function and outcome
    pub static ref LEDGER_TRANSACTIONS: CounterVec = CounterVec::new(
        Opts::new("cl_ledger_transactions_total", "Ledger transactions submitted"),
        &["function", "outcome"]  // outcome: confirmed/reverted/rejected
    ).expect("metric creation failed");

    /// Gas consumed by confirmed transactions
    pub static ref LEDGER_GAS_USED: Counter = Counter::new(
        "cl_ledger_gas_used_total",
        "Gas consumed by transactions this process submitted"
    ).expect("metric creation failed");

    /// Time from submission to receipt
    pub static ref LEDGER_RECEIPT_WAIT: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cl_ledger_receipt_wait_seconds",
            "Time spent polling for transaction receipts"
        ).buckets(exponential_buckets(0.001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // ACCESS CONTROL (cl-02)
    // =========================================================================

    /// Role grants and revocations
    pub static ref ROLE_CHANGES: CounterVec = CounterVec::new(
        Opts::new("cl_access_role_changes_total", "Role grants and revocations"),
        &["action", "role"]
    ).expect("metric creation failed");

    /// Role checks that could not be answered
    pub static ref ROLE_CHECKS_UNKNOWN: Counter = Counter::new(
        "cl_access_role_checks_unknown_total",
        "Per-role membership queries that failed"
    ).expect("metric creation failed");

    // =========================================================================
    // IDENTITY BINDING (cl-03)
    // =========================================================================

    /// Challenges handed out
    pub static ref CHALLENGES_ISSUED: Counter = Counter::new(
        "cl_identity_challenges_issued_total",
        "Challenges issued"
    ).expect("metric creation failed");

    /// Verification attempts by outcome
    pub static ref AUTH_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("cl_identity_auth_attempts_total", "Challenge verification attempts"),
        &["outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // CREDENTIAL LIFECYCLE (cl-04)
    // =========================================================================

    /// Credentials registered on the ledger
    pub static ref CREDENTIALS_ISSUED: CounterVec = CounterVec::new(
        Opts::new("cl_lifecycle_credentials_issued_total", "Credentials issued"),
        &["storage_mode"]
    ).expect("metric creation failed");

    /// Credentials revoked
    pub static ref CREDENTIALS_REVOKED: Counter = Counter::new(
        "cl_lifecycle_credentials_revoked_total",
        "Credentials revoked"
    ).expect("metric creation failed");

    /// Lifecycle failures by operation and error kind
    pub static ref LIFECYCLE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("cl_lifecycle_failures_total", "Failed lifecycle operations"),
        &["operation", "kind"]
    ).expect("metric creation failed");

    /// Uploads left without a ledger record
    pub static ref ORPHANED_UPLOADS: Counter = Counter::new(
        "cl_lifecycle_orphaned_uploads_total",
        "External uploads whose ledger registration failed"
    ).expect("metric creation failed");

    // =========================================================================
    // AUDIT PROJECTION (cl-05)
    // =========================================================================

    /// Full replay duration
    pub static ref AUDIT_REPLAY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cl_audit_replay_duration_seconds",
            "Time spent replaying ledger events"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Highest block folded into the projection
    pub static ref PROJECTION_HEIGHT: Gauge = Gauge::new(
        "cl_audit_projection_height",
        "Last ledger block indexed by the audit projection"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ledger
        Box::new(LEDGER_TRANSACTIONS.clone()),
        Box::new(LEDGER_GAS_USED.clone()),
        Box::new(LEDGER_RECEIPT_WAIT.clone()),
        // Access control
        Box::new(ROLE_CHANGES.clone()),
        Box::new(ROLE_CHECKS_UNKNOWN.clone()),
        // Identity
        Box::new(CHALLENGES_ISSUED.clone()),
        Box::new(AUTH_ATTEMPTS.clone()),
        // Lifecycle
        Box::new(CREDENTIALS_ISSUED.clone()),
        Box::new(CREDENTIALS_REVOKED.clone()),
        Box::new(LIFECYCLE_FAILURES.clone()),
        Box::new(ORPHANED_UPLOADS.clone()),
        // Audit
        Box::new(AUDIT_REPLAY_DURATION.clone()),
        Box::new(PROJECTION_HEIGHT.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
