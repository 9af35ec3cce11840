//! The lending ledger
//!
//! Every state change follows the same protocol, under the item's lock:
//!
//! 1. read the current state from the cache and compute the new record and
//!    state without touching the cache;
//! 2. persist both through the store in one atomic write;
//! 3. only if that succeeded, apply the same change to the cache.
//!
//! A failed write returns [`AppError::Persistence`] with cache and store
//! exactly as they were.

pub mod cache;
pub mod locks;
pub mod log;
pub mod state_machine;

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{LendingStatus, TransactionKind},
        item::{validate_key, Item, ItemMetadata, MetadataPatch},
        transaction::{LendingState, TransactionRecord},
    },
    repository::LedgerStore,
};

pub use cache::{CacheSnapshot, LedgerCache, LedgerEntry};
use locks::KeyLocks;
use state_machine::Transition;

/// Result of a committed checkout or checkin
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LendingOutcome {
    pub isbn: String,
    pub title: String,
    pub record: TransactionRecord,
    pub state: LendingState,
}

pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    cache: LedgerCache,
    locks: KeyLocks,
    strict_isbn: bool,
}

impl Ledger {
    /// Load everything from `store` and build the cache.
    ///
    /// States the cache had to derive from history (stale or missing status
    /// rows) are written back, so store and cache agree before the first
    /// request is served.
    pub async fn open(store: Arc<dyn LedgerStore>, strict_isbn: bool) -> AppResult<Self> {
        let snapshot = store.load_all().await?;
        let persisted = snapshot.states.clone();
        let cache = LedgerCache::from_snapshot(snapshot)?;

        let mut written = 0usize;
        for (isbn, entry) in cache.snapshot() {
            if entry.history.is_empty() || persisted.get(&isbn) == Some(&entry.state) {
                continue;
            }
            store.put_state(&isbn, &entry.state).await?;
            written += 1;
        }
        if written > 0 {
            tracing::info!("Wrote back {} repaired item states", written);
        }

        Ok(Self {
            store,
            cache,
            locks: KeyLocks::new(),
            strict_isbn,
        })
    }

    pub fn cache(&self) -> &LedgerCache {
        &self.cache
    }

    pub fn validate_key(&self, raw: &str) -> AppResult<String> {
        validate_key(raw, self.strict_isbn)
    }

    pub fn get(&self, raw: &str) -> AppResult<LedgerEntry> {
        let isbn = self.validate_key(raw)?;
        self.cache.entry(&isbn)
    }

    pub fn history(&self, raw: &str) -> AppResult<Vec<TransactionRecord>> {
        let isbn = self.validate_key(raw)?;
        self.cache.history(&isbn)
    }

    pub async fn check_out(
        &self,
        raw: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> AppResult<LendingOutcome> {
        self.transition(raw, actor, now, Some(TransactionKind::CheckOut)).await
    }

    pub async fn check_in(
        &self,
        raw: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> AppResult<LendingOutcome> {
        self.transition(raw, actor, now, Some(TransactionKind::CheckIn)).await
    }

    /// Check out a checked in item, or check in a checked out one
    pub async fn toggle(
        &self,
        raw: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> AppResult<LendingOutcome> {
        self.transition(raw, actor, now, None).await
    }

    async fn transition(
        &self,
        raw: &str,
        actor: &str,
        now: NaiveDateTime,
        requested: Option<TransactionKind>,
    ) -> AppResult<LendingOutcome> {
        let isbn = self.validate_key(raw)?;
        let _guard = self.locks.acquire(&isbn).await;

        let current = self.cache.state(&isbn)?;
        let Transition { record, state } = match requested {
            Some(kind) => state_machine::request(&isbn, &current, kind, actor, now)
                .map_err(|e| {
                    tracing::warn!("Rejected {} of {}: item is {}", kind, isbn, current.status);
                    e
                })?,
            None => state_machine::toggle(&isbn, &current, actor, now),
        };

        let id = self
            .store
            .commit(&isbn, &record, &state)
            .await
            .map_err(|e| persistence_failure(&isbn, e))?;

        let record = record.into_record(id);
        self.cache.apply(record.clone(), state)?;
        let title = self.cache.item(&isbn)?.metadata.title;

        tracing::info!("Item {} is now {} (transaction {})", isbn, state.status, id);

        Ok(LendingOutcome {
            isbn,
            title,
            record,
            state,
        })
    }

    /// Add a new item with a seeding record reflecting `initial`
    pub async fn add_item(
        &self,
        raw: &str,
        metadata: ItemMetadata,
        initial: LendingStatus,
        actor: &str,
        now: NaiveDateTime,
    ) -> AppResult<LedgerEntry> {
        let isbn = self.validate_key(raw)?;
        let _guard = self.locks.acquire(&isbn).await;

        if self.cache.contains(&isbn) {
            return Err(AppError::DuplicateItem(isbn));
        }

        let item = Item::new(isbn.clone(), metadata);
        let Transition { record, state } = state_machine::seed(&isbn, initial, actor, now);

        let id = self
            .store
            .create_item(&item, &record, &state)
            .await
            .map_err(|e| persistence_failure(&isbn, e))?;

        let entry = LedgerEntry {
            item,
            history: vec![record.into_record(id)],
            state,
        };
        self.cache.insert(entry.clone())?;

        tracing::info!("Added item {} ({})", isbn, state.status);
        Ok(entry)
    }

    /// Merge `patch` into an item's metadata. An empty patch writes nothing.
    pub async fn update_metadata(&self, raw: &str, patch: &MetadataPatch) -> AppResult<Item> {
        let isbn = self.validate_key(raw)?;
        let _guard = self.locks.acquire(&isbn).await;

        let mut item = self.cache.item(&isbn)?;
        if patch.is_empty() {
            return Ok(item);
        }
        item.metadata = patch.apply_to(&item.metadata);

        self.store
            .update_item(&item)
            .await
            .map_err(|e| persistence_failure(&isbn, e))?;
        self.cache.replace_item(item.clone())?;

        tracing::info!("Updated metadata of {}", isbn);
        Ok(item)
    }
}

/// A store failure after validation passed means cache and store disagree or
/// the medium failed; either way the caller sees a retryable error.
fn persistence_failure(isbn: &str, e: AppError) -> AppError {
    tracing::error!("Persisting change to {} failed: {}", isbn, e);
    match e {
        AppError::Persistence(_) | AppError::DuplicateItem(_) => e,
        other => AppError::Persistence(other.to_string()),
    }
}
