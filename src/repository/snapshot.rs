//! File-snapshot store: the whole ledger as one JSON document

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        item::Item,
        transaction::{LendingState, PendingRecord, RecordId, TransactionRecord},
    },
};

use super::{memory::MemoryState, LedgerSnapshot, LedgerStore};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    items: Vec<Item>,
    transactions: Vec<TransactionRecord>,
    states: BTreeMap<String, LendingState>,
}

/// Every write stages the change on a copy, rewrites the file through a
/// temporary sibling and a rename, and only then swaps the copy in. A failed
/// write leaves both the file and the in-memory state untouched.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    state: Mutex<MemoryState>,
}

impl SnapshotStore {
    /// Open `path`, starting empty if it does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let doc: SnapshotDocument = serde_json::from_slice(&bytes)?;
                if doc.version != FORMAT_VERSION {
                    return Err(AppError::Persistence(format!(
                        "unsupported snapshot version {} in {}",
                        doc.version,
                        path.display()
                    )));
                }
                tracing::info!(
                    "Loaded snapshot {} ({} items, {} transactions)",
                    path.display(),
                    doc.items.len(),
                    doc.transactions.len()
                );
                MemoryState::from_snapshot(LedgerSnapshot {
                    items: doc.items,
                    transactions: doc.transactions,
                    states: doc.states,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No snapshot at {}, starting empty", path.display());
                MemoryState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    async fn write(&self, state: &MemoryState) -> AppResult<()> {
        let snapshot = state.to_snapshot();
        let doc = SnapshotDocument {
            version: FORMAT_VERSION,
            items: snapshot.items,
            transactions: snapshot.transactions,
            states: snapshot.states,
        };
        let bytes = serde_json::to_vec_pretty(&doc)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `change` to a copy, persist it, then publish it
    async fn stage<T, F>(&self, change: F) -> AppResult<T>
    where
        F: FnOnce(&mut MemoryState) -> AppResult<T> + Send,
        T: Send,
    {
        let mut current = self.state.lock().await;
        let mut next = current.clone();
        let result = change(&mut next)?;
        self.write(&next).await?;
        *current = next;
        Ok(result)
    }
}

#[async_trait]
impl LedgerStore for SnapshotStore {
    async fn load_all(&self) -> AppResult<LedgerSnapshot> {
        Ok(self.state.lock().await.to_snapshot())
    }

    async fn create_item(
        &self,
        item: &Item,
        seed: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        self.stage(|s| s.create_item(item, seed, state)).await
    }

    async fn commit(
        &self,
        isbn: &str,
        record: &PendingRecord,
        state: &LendingState,
    ) -> AppResult<RecordId> {
        self.stage(|s| s.commit(isbn, record, state)).await
    }

    async fn update_item(&self, item: &Item) -> AppResult<()> {
        self.stage(|s| s.update_item(item)).await
    }

    async fn put_state(&self, isbn: &str, state: &LendingState) -> AppResult<()> {
        self.stage(|s| s.put_state(isbn, state)).await
    }
}
