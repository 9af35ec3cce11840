//! Catalog management service

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    ledger::{Ledger, LedgerEntry},
    models::{
        enums::LendingStatus,
        item::{Item, ItemMetadata, MetadataPatch},
        transaction::{self, LendingState},
    },
};

use super::metadata::MetadataSource;

/// Add item request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddItem {
    pub isbn: String,
    #[serde(flatten)]
    pub metadata: ItemMetadata,
    #[serde(default)]
    pub initial_status: LendingStatus,
    /// User adding the item
    #[serde(default)]
    pub username: String,
}

/// One row of the catalog page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogEntryView {
    pub item: Item,
    pub state: LendingState,
    pub transaction_count: usize,
    /// Checked out for longer than the configured number of days
    pub past_due: bool,
}

/// Everything the catalog page renders
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogView {
    #[schema(value_type = String)]
    pub generated_at: NaiveDateTime,
    pub shelves: Vec<String>,
    pub past_due_days: u32,
    pub items: Vec<CatalogEntryView>,
}

#[derive(Clone)]
pub struct CatalogService {
    ledger: Arc<Ledger>,
    library: LibraryConfig,
    metadata: Arc<dyn MetadataSource>,
}

impl CatalogService {
    pub fn new(
        ledger: Arc<Ledger>,
        library: LibraryConfig,
        metadata: Arc<dyn MetadataSource>,
    ) -> Self {
        Self {
            ledger,
            library,
            metadata,
        }
    }

    /// Current catalog, as of `now`
    pub fn snapshot(&self, now: NaiveDateTime) -> CatalogView {
        let past_due_after = Duration::days(i64::from(self.library.past_due_days));
        let items = self
            .ledger
            .cache()
            .snapshot()
            .into_values()
            .map(|entry| {
                let past_due = entry.state.status == LendingStatus::CheckedOut
                    && entry
                        .state
                        .last_transaction
                        .map_or(false, |since| now - since > past_due_after);
                CatalogEntryView {
                    transaction_count: entry.history.len(),
                    item: entry.item,
                    state: entry.state,
                    past_due,
                }
            })
            .collect();

        CatalogView {
            generated_at: now,
            shelves: self.library.shelves.clone(),
            past_due_days: self.library.past_due_days,
            items,
        }
    }

    pub fn get(&self, isbn: &str) -> AppResult<LedgerEntry> {
        self.ledger.get(isbn)
    }

    /// Add an item, consulting the metadata source first.
    ///
    /// The lookup happens before anything is written, so a failed lookup
    /// leaves no trace of the item.
    pub async fn add_item(&self, request: AddItem) -> AppResult<LedgerEntry> {
        let isbn = self.ledger.validate_key(&request.isbn)?;
        if self.ledger.cache().contains(&isbn) {
            return Err(AppError::DuplicateItem(isbn));
        }

        let metadata = match self.metadata.fetch(&isbn).await? {
            Some(patch) => patch.apply_to(&request.metadata),
            None => request.metadata,
        };

        self.ledger
            .add_item(
                &isbn,
                metadata,
                request.initial_status,
                &request.username,
                transaction::now(),
            )
            .await
    }

    /// Overwrite metadata fields with the non-blank values of `patch`
    pub async fn update_metadata(&self, isbn: &str, patch: MetadataPatch) -> AppResult<Item> {
        self.ledger.update_metadata(isbn, &patch).await
    }

    /// Re-run the metadata lookup for an existing item
    pub async fn refresh_metadata(&self, isbn: &str) -> AppResult<Item> {
        let isbn = self.ledger.validate_key(isbn)?;
        let current = self.ledger.cache().item(&isbn)?;
        match self.metadata.fetch(&isbn).await? {
            Some(patch) => self.ledger.update_metadata(&isbn, &patch).await,
            None => Ok(current),
        }
    }
}
