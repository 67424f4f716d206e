//! # Domain Layer
//!
//! The advisory role cache and the subsystem error type.

pub mod cache;
pub mod errors;

pub use cache::{CachedRoles, RoleCache};
pub use errors::AccessError;
