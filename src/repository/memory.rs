//! In-process store, durable for the lifetime of the process only

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    ledger::log::TransactionLog,
    models::{
        item::Item,
        transaction::{LendingState, PendingRecord, RecordId},
    },
};

use super::{LedgerSnapshot, LedgerStore};

/// Catalog, log and states as one value, so a write can be staged on a copy
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    items: BTreeMap<String, Item>,
    log: TransactionLog,
    states: BTreeMap<String, LendingState>,
}

impl MemoryState {
    pub(crate) fn from_snapshot(snapshot: LedgerSnapshot) -> AppResult<Self> {
        let mut state = Self::default();
        for item in snapshot.items {
            state.log.register(&item.isbn);
            state.items.insert(item.isbn.clone(), item);
        }
        for record in snapshot.transactions {
            state.log.restore(record).map_err(|e| match e {
                AppError::UnknownItem(isbn) => {
                    AppError::Persistence(format!("transaction for unknown item {}", isbn))
                }
                other => other,
            })?;
        }
        state.states = snapshot.states;
        Ok(state)
    }

    pub(crate) fn to_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            items: self.items.values().cloned().collect(),
            transactions: self.log.records(),
            states: self.states.clone(),
        }
    }

    pub(crate) fn create_item(
        &mut self,
        item: &Item,
        seed: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        if !self.log.register(&item.isbn) {
            return Err(AppError::DuplicateItem(item.isbn.clone()));
        }
        self.items.insert(item.isbn.clone(), item.clone());
        let id = self
            .log
            .append(&item.isbn, seed.kind, seed.timestamp, &seed.actor)?;
        self.states.insert(item.isbn.clone(), *state);
        Ok(id)
    }

    pub(crate) fn commit(
        &mut self,
        isbn: &str,
        record: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        let id = self
            .log
            .append(isbn, record.kind, record.timestamp, &record.actor)?;
        self.states.insert(isbn.to_string(), *state);
        Ok(id)
    }

    pub(crate) fn update_item(&mut self, item: &Item) -> AppResult<()> {
        let current = self
            .items
            .get_mut(&item.isbn)
            .ok_or_else(|| AppError::UnknownItem(item.isbn.clone()))?;
        *current = item.clone();
        Ok(())
    }

    pub(crate) fn put_state(&mut self, isbn: &str, state: &LendingState) -> AppResult<()> {
        if !self.log.contains(isbn) {
            return Err(AppError::UnknownItem(isbn.to_string()));
        }
        self.states.insert(isbn.to_string(), *state);
        Ok(())
    }
}

/// Store backed by nothing but memory. Used for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current durable contents
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().to_snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load_all(&self) -> AppResult<LedgerSnapshot> {
        Ok(self.snapshot())
    }

    async fn create_item(
        &self,
        item: &Item,
        seed: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        self.lock().create_item(item, seed, state)
    }

    async fn commit(
        &self,
        isbn: &str,
        record: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        self.lock().commit(isbn, record, state)
    }

    async fn update_item(&self, item: &Item) -> AppResult<()> {
        self.lock().update_item(item)
    }

    async fn put_state(&self, isbn: &str, state: &LendingState) -> AppResult<()> {
        self.lock().put_state(isbn, state)
    }
}
