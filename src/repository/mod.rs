//! Durable ledger stores
//!
//! A store owns the catalog, the transaction log and the persisted lending
//! states. Every write is atomic: the record and the state it produces land
//! together or not at all.

pub mod memory;
pub mod snapshot;
pub mod sqlite;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::{StorageBackend, StorageConfig},
    error::AppResult,
    models::{
        item::Item,
        transaction::{LendingState, PendingRecord, RecordId, TransactionRecord},
    },
};

pub use memory::MemoryStore;
pub use snapshot::SnapshotStore;
pub use sqlite::SqliteStore;

/// Everything a store holds, as read at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub items: Vec<Item>,
    /// All records, in append order
    pub transactions: Vec<TransactionRecord>,
    pub states: BTreeMap<String, LendingState>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the whole ledger
    async fn load_all(&self) -> AppResult<LedgerSnapshot>;

    /// Insert a catalog entry together with its seeding record and state
    async fn create_item(
        &self,
        item: &Item,
        seed: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId>;

    /// Append `record` and store `state` for `isbn` in one transaction
    async fn commit(
        &self,
        isbn: &str,
        record: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId>;

    /// Replace the metadata of an existing item
    async fn update_item(&self, item: &Item) -> AppResult<()>;

    /// Overwrite the persisted state of an existing item without appending
    /// a record. Used to write back states repaired at load.
    async fn put_state(&self, isbn: &str, state: &LendingState) -> AppResult<()>;
}

/// Open the store selected in the configuration
pub async fn open_store(config: &StorageConfig) -> AppResult<Arc<dyn LedgerStore>> {
    let store: Arc<dyn LedgerStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Sqlite => {
            Arc::new(SqliteStore::connect(&config.url, config.max_connections).await?)
        }
        StorageBackend::Snapshot => Arc::new(SnapshotStore::open(&config.snapshot_path).await?),
    };
    Ok(store)
}
