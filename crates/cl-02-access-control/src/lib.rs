//! # CL-02 Access Control
//!
//! Administers the three fixed roles (`Admin`, `Issuer`, `Student`) held by
//! the registry program and answers membership checks for any address.
//!
//! ## Management Matrix
//!
//! | Actor holds | May grant/revoke |
//! |-------------|------------------|
//! | `Admin` | `Admin`, `Issuer`, `Student` |
//! | `Issuer` | `Student` |
//! | `Student` | nothing |
//!
//! Permission is decided before any ledger call. Membership queries that
//! fail report `RoleStatus::Unknown` rather than `Absent`.

#![warn(clippy::all)]

pub mod domain;
pub mod service;

pub use domain::{AccessError, CachedRoles, RoleCache};
pub use service::{AccessControlService, RoleChange};
