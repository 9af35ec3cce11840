//! Data models for the home library

pub mod enums;
pub mod item;
pub mod stats;
pub mod transaction;

// Re-export commonly used types
pub use enums::{LendingStatus, TransactionKind};
pub use item::{Item, ItemMetadata, MetadataPatch};
pub use transaction::{LendingState, RecordId, TransactionRecord};
