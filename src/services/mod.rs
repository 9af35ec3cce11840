//! Business logic services

pub mod catalog;
pub mod loans;
pub mod metadata;
pub mod stats;

use std::sync::Arc;

use crate::{config::LibraryConfig, ledger::Ledger};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<Ledger>,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services around a loaded ledger
    pub fn new(
        ledger: Arc<Ledger>,
        library: LibraryConfig,
        metadata: Arc<dyn metadata::MetadataSource>,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(ledger.clone(), library, metadata),
            loans: loans::LoansService::new(ledger.clone()),
            stats: stats::StatsService::new(ledger.clone()),
            ledger,
        }
    }
}
