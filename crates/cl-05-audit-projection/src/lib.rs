//! # CL-05 Audit Projection
//!
//! Reconstructs credential history from registry events.
//!
//! - `replay_full`: every event from genesis, enriched with block time and
//!   gas, newest first. Used for verification and as the reference the
//!   projection is checked against.
//! - `AuditProjection`: in-memory index advanced by `catch_up()`. Dashboards
//!   and listings read it.
//!
//! A program without revocation events yields an empty revocation list, not
//! an error.

#![warn(clippy::all)]

pub mod domain;
pub mod projection;
pub mod replay;
pub mod service;

pub use domain::*;
pub use projection::{AuditProjection, CatchUp};
pub use replay::replay_full;
pub use service::{AuditConfig, AuditService, DEFAULT_RECENT_WINDOW};
