//! Catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    ledger::LedgerEntry,
    models::{
        item::{Item, MetadataPatch},
        transaction,
    },
    services::catalog::{AddItem, CatalogView},
};

/// Added item with its seeding transaction
#[derive(Serialize, ToSchema)]
pub struct AddItemResponse {
    /// Status message key
    pub message: String,
    pub entry: LedgerEntry,
}

/// Item after a metadata change
#[derive(Serialize, ToSchema)]
pub struct MetadataResponse {
    /// Status message key
    pub message: String,
    pub item: Item,
}

/// Full catalog with lending state
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    responses(
        (status = 200, description = "Catalog snapshot", body = CatalogView)
    )
)]
pub async fn list_items(State(state): State<crate::AppState>) -> Json<CatalogView> {
    Json(state.services.catalog.snapshot(transaction::now()))
}

/// Get one item with its full history
#[utoipa::path(
    get,
    path = "/items/{isbn}",
    tag = "items",
    params(
        ("isbn" = String, Path, description = "Item ISBN")
    ),
    responses(
        (status = 200, description = "Item details", body = LedgerEntry),
        (status = 400, description = "Invalid ISBN"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<LedgerEntry>> {
    let entry = state.services.catalog.get(&isbn)?;
    Ok(Json(entry))
}

/// Add a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = AddItem,
    responses(
        (status = 201, description = "Item added", body = AddItemResponse),
        (status = 400, description = "Invalid ISBN"),
        (status = 409, description = "Item already exists"),
        (status = 503, description = "Storage unavailable, retry")
    )
)]
pub async fn add_item(
    State(state): State<crate::AppState>,
    Json(request): Json<AddItem>,
) -> AppResult<(StatusCode, Json<AddItemResponse>)> {
    let entry = state.services.catalog.add_item(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddItemResponse {
            message: "book_added".to_string(),
            entry,
        }),
    ))
}

/// Overwrite metadata fields
#[utoipa::path(
    patch,
    path = "/items/{isbn}/metadata",
    tag = "items",
    params(
        ("isbn" = String, Path, description = "Item ISBN")
    ),
    request_body = MetadataPatch,
    responses(
        (status = 200, description = "Metadata updated", body = MetadataResponse),
        (status = 404, description = "Item not found"),
        (status = 503, description = "Storage unavailable, retry")
    )
)]
pub async fn update_metadata(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
    Json(patch): Json<MetadataPatch>,
) -> AppResult<Json<MetadataResponse>> {
    let item = state.services.catalog.update_metadata(&isbn, patch).await?;
    Ok(Json(MetadataResponse {
        message: "metadata_updated".to_string(),
        item,
    }))
}

/// Look the item's metadata up again
#[utoipa::path(
    post,
    path = "/items/{isbn}/metadata/refresh",
    tag = "items",
    params(
        ("isbn" = String, Path, description = "Item ISBN")
    ),
    responses(
        (status = 200, description = "Metadata refreshed", body = MetadataResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn refresh_metadata(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<MetadataResponse>> {
    let item = state.services.catalog.refresh_metadata(&isbn).await?;
    Ok(Json(MetadataResponse {
        message: "metadata_updated".to_string(),
        item,
    }))
}
