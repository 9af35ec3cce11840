//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, items, loans, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Home Library API",
        version = "0.3.0",
        description = "Home library catalog, lending ledger and statistics"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items
        items::list_items,
        items::get_item,
        items::add_item,
        items::update_metadata,
        items::refresh_metadata,
        // Loans
        loans::checkout_or_checkin,
        loans::check_out,
        loans::check_in,
        // Stats
        stats::get_stats,
    ),
    components(
        schemas(
            // Items
            crate::models::item::Item,
            crate::models::item::ItemMetadata,
            crate::models::item::MetadataPatch,
            crate::models::transaction::TransactionRecord,
            crate::models::transaction::LendingState,
            crate::models::enums::LendingStatus,
            crate::models::enums::TransactionKind,
            crate::ledger::LedgerEntry,
            crate::services::catalog::AddItem,
            crate::services::catalog::CatalogView,
            crate::services::catalog::CatalogEntryView,
            items::AddItemResponse,
            items::MetadataResponse,
            // Loans
            loans::LendingRequest,
            loans::ActorRequest,
            loans::LendingResponse,
            crate::ledger::LendingOutcome,
            // Stats
            crate::models::stats::StatsResponse,
            crate::models::stats::BusiestItems,
            crate::models::stats::ItemRef,
            crate::models::stats::LongestSession,
            crate::models::stats::StatEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Catalog management"),
        (name = "loans", description = "Checkout and checkin"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
