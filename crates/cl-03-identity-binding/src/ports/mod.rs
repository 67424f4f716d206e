pub mod outbound;

pub use outbound::{IdentityStore, RoleResolver};
