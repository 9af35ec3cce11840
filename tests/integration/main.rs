//! Integration tests for the lending ledger, its stores and the HTTP API

mod api_tests;
mod store_tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use homelib_server::{
    error::{AppError, AppResult},
    models::{
        item::{Item, ItemMetadata},
        transaction::{parse_timestamp, LendingState, PendingRecord, RecordId},
    },
    repository::{LedgerSnapshot, LedgerStore, MemoryStore},
};

pub fn at(value: &str) -> NaiveDateTime {
    parse_timestamp(value).expect("valid timestamp")
}

pub fn book(title: &str) -> ItemMetadata {
    ItemMetadata {
        title: title.to_string(),
        authors: "Anonymous".to_string(),
        home_shelf: "Study".to_string(),
        ..Default::default()
    }
}

/// Memory store whose writes can be made to fail on demand
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("simulated write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn load_all(&self) -> AppResult<LedgerSnapshot> {
        self.inner.load_all().await
    }

    async fn create_item(
        &self,
        item: &Item,
        seed: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        self.check()?;
        self.inner.create_item(item, seed, state).await
    }

    async fn commit(
        &self,
        isbn: &str,
        record: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        self.check()?;
        self.inner.commit(isbn, record, state).await
    }

    async fn update_item(&self, item: &Item) -> AppResult<()> {
        self.check()?;
        self.inner.update_item(item).await
    }

    async fn put_state(&self, isbn: &str, state: &LendingState) -> AppResult<()> {
        self.check()?;
        self.inner.put_state(isbn, state).await
    }
}
