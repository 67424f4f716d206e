pub mod entities;
pub mod errors;
pub mod orphans;

pub use entities::*;
pub use errors::{ContentStoreError, LifecycleError};
pub use orphans::OrphanRegistry;
