//! Bibliographic metadata lookup

use async_trait::async_trait;

use crate::{error::AppResult, models::item::MetadataPatch};

/// Looks up metadata for an ISBN, e.g. from an online catalog.
///
/// `Ok(None)` means nothing was found. An error aborts the operation that
/// asked for the lookup.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, isbn: &str) -> AppResult<Option<MetadataPatch>>;
}

/// Source used when automatic lookup is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

#[async_trait]
impl MetadataSource for NoMetadata {
    async fn fetch(&self, _isbn: &str) -> AppResult<Option<MetadataPatch>> {
        Ok(None)
    }
}
