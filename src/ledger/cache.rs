//! In-memory projection of the ledger store

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        item::Item,
        transaction::{LendingState, TransactionRecord},
    },
    repository::LedgerSnapshot,
};

/// One catalog entry with its ordered history and current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LedgerEntry {
    pub item: Item,
    pub history: Vec<TransactionRecord>,
    pub state: LendingState,
}

impl LedgerEntry {
    /// `state.status` must equal the kind of the last record
    pub fn is_consistent(&self) -> bool {
        match LendingState::from_history(&self.history) {
            Some(derived) => derived.status == self.state.status,
            None => true,
        }
    }
}

/// Cache entries keyed by ISBN, iterated in ascending key order
pub type CacheSnapshot = BTreeMap<String, LedgerEntry>;

/// Read side of the ledger.
///
/// Mutations are crate-private and only happen after the store has accepted
/// the same change.
#[derive(Debug, Default)]
pub struct LedgerCache {
    entries: RwLock<CacheSnapshot>,
}

impl LedgerCache {
    /// Build the cache from a store snapshot, repairing persisted states that
    /// disagree with the log.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> AppResult<Self> {
        let LedgerSnapshot {
            items,
            transactions,
            mut states,
        } = snapshot;

        let mut entries: CacheSnapshot = items
            .into_iter()
            .map(|item| {
                (
                    item.isbn.clone(),
                    LedgerEntry {
                        item,
                        history: Vec::new(),
                        state: LendingState::default(),
                    },
                )
            })
            .collect();

        for record in transactions {
            let entry = entries.get_mut(&record.isbn).ok_or_else(|| {
                AppError::Persistence(format!(
                    "transaction {} references unknown item {}",
                    record.id, record.isbn
                ))
            })?;
            entry.history.push(record);
        }

        let mut repaired = 0usize;
        for (isbn, entry) in entries.iter_mut() {
            let persisted = states.remove(isbn);
            entry.state = match (LendingState::from_history(&entry.history), persisted) {
                (Some(derived), Some(persisted)) if derived != persisted => {
                    tracing::warn!(
                        "Stored status of {} ({} at {:?}) disagrees with its history, using {}",
                        isbn,
                        persisted.status,
                        persisted.last_transaction,
                        derived.status
                    );
                    repaired += 1;
                    derived
                }
                (Some(derived), _) => derived,
                (None, Some(persisted)) => persisted,
                (None, None) => LendingState::default(),
            };
        }

        for isbn in states.keys() {
            tracing::warn!("Ignoring stored status for unknown item {}", isbn);
        }

        tracing::info!(
            "Ledger cache loaded: {} items, {} repaired",
            entries.len(),
            repaired
        );

        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheSnapshot> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheSnapshot> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, isbn: &str) -> bool {
        self.read().contains_key(isbn)
    }

    pub fn state(&self, isbn: &str) -> AppResult<LendingState> {
        self.read()
            .get(isbn)
            .map(|entry| entry.state)
            .ok_or_else(|| AppError::UnknownItem(isbn.to_string()))
    }

    pub fn item(&self, isbn: &str) -> AppResult<Item> {
        self.read()
            .get(isbn)
            .map(|entry| entry.item.clone())
            .ok_or_else(|| AppError::UnknownItem(isbn.to_string()))
    }

    pub fn entry(&self, isbn: &str) -> AppResult<LedgerEntry> {
        self.read()
            .get(isbn)
            .cloned()
            .ok_or_else(|| AppError::UnknownItem(isbn.to_string()))
    }

    pub fn history(&self, isbn: &str) -> AppResult<Vec<TransactionRecord>> {
        self.read()
            .get(isbn)
            .map(|entry| entry.history.clone())
            .ok_or_else(|| AppError::UnknownItem(isbn.to_string()))
    }

    /// Copy of every entry. The read lock is released before this returns.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.read().clone()
    }

    pub(crate) fn insert(&self, entry: LedgerEntry) -> AppResult<()> {
        let mut entries = self.write();
        if entries.contains_key(&entry.item.isbn) {
            return Err(AppError::DuplicateItem(entry.item.isbn.clone()));
        }
        entries.insert(entry.item.isbn.clone(), entry);
        Ok(())
    }

    pub(crate) fn apply(&self, record: TransactionRecord, state: LendingState) -> AppResult<()> {
        let mut entries = self.write();
        let entry = entries
            .get_mut(&record.isbn)
            .ok_or_else(|| AppError::UnknownItem(record.isbn.clone()))?;
        entry.history.push(record);
        entry.state = state;
        debug_assert!(entry.is_consistent());
        Ok(())
    }

    pub(crate) fn replace_item(&self, item: Item) -> AppResult<()> {
        let mut entries = self.write();
        let entry = entries
            .get_mut(&item.isbn)
            .ok_or_else(|| AppError::UnknownItem(item.isbn.clone()))?;
        entry.item = item;
        Ok(())
    }
}
