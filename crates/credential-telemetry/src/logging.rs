//! Structured log helpers.
//!
//! Every event carries a `subsystem` field so log queries can be sliced the
//! same way the metrics are.

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    (info, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (error, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a credential event with the fingerprint attached.
#[macro_export]
macro_rules! log_credential_event {
    ($level:ident, $subsystem:expr, $msg:expr, $fingerprint:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            fingerprint = %$fingerprint,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a ledger transaction event with the transaction hash attached.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $subsystem:expr, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}
