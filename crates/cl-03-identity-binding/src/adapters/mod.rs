pub mod memory;
pub mod roles;

pub use memory::InMemoryIdentityStore;
