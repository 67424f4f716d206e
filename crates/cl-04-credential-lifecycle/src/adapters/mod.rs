pub mod ipfs;
pub mod memory;

pub use ipfs::IpfsContentStore;
pub use memory::{InMemoryContentStore, InMemoryMirror};
