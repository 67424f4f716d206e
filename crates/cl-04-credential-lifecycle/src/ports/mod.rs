pub mod outbound;

pub use outbound::{ContentStore, ContentStoreStatus, TransactionMirror};
