//! Append-only transaction log

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::TransactionKind,
        transaction::{RecordId, TransactionRecord},
    },
};

/// Per-item ordered histories with store-wide record ids.
///
/// Records can only be appended. Within one history they stay in the order
/// they were appended, which is what defines the latest transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    histories: BTreeMap<String, Vec<TransactionRecord>>,
    last_id: RecordId,
}

impl TransactionLog {
    /// Make `isbn` a known key. Returns false if it already was.
    pub fn register(&mut self, isbn: &str) -> bool {
        if self.histories.contains_key(isbn) {
            return false;
        }
        self.histories.insert(isbn.to_string(), Vec::new());
        true
    }

    pub fn contains(&self, isbn: &str) -> bool {
        self.histories.contains_key(isbn)
    }

    /// Append a new event and assign it the next record id
    pub fn append(
        &mut self,
        isbn: &str,
        kind: TransactionKind,
        timestamp: NaiveDateTime,
        actor: &str,
    ) -> AppResult<RecordId> {
        let history = self
            .histories
            .get_mut(isbn)
            .ok_or_else(|| AppError::UnknownItem(isbn.to_string()))?;

        let id = self.last_id + 1;
        history.push(TransactionRecord {
            id,
            isbn: isbn.to_string(),
            kind,
            timestamp,
            actor: actor.to_string(),
        });
        self.last_id = id;
        Ok(id)
    }

    /// Replay a record that already carries its id (e.g. read back from disk).
    /// Ids must arrive in increasing order.
    pub fn restore(&mut self, record: TransactionRecord) -> AppResult<()> {
        if record.id <= self.last_id {
            return Err(AppError::Persistence(format!(
                "transaction {} is out of order (last id {})",
                record.id, self.last_id
            )));
        }
        let history = self
            .histories
            .get_mut(&record.isbn)
            .ok_or_else(|| AppError::UnknownItem(record.isbn.clone()))?;
        self.last_id = record.id;
        history.push(record);
        Ok(())
    }

    /// Every record in id order
    pub fn records(&self) -> Vec<TransactionRecord> {
        let mut all: Vec<TransactionRecord> =
            self.histories.values().flatten().cloned().collect();
        all.sort_by_key(|record| record.id);
        all
    }
}
