//! Checkout / checkin endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    ledger::LendingOutcome,
    models::enums::LendingStatus,
};

/// Checkout-or-checkin request
#[derive(Deserialize, ToSchema)]
pub struct LendingRequest {
    /// Item ISBN
    pub isbn: String,
    /// User performing the transaction
    #[serde(default)]
    pub username: String,
}

/// Explicit checkout / checkin request
#[derive(Default, Deserialize, ToSchema)]
pub struct ActorRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct LendingResponse {
    /// New status of the item
    pub status: LendingStatus,
    /// Status message key
    pub message: String,
    pub outcome: LendingOutcome,
}

impl From<LendingOutcome> for LendingResponse {
    fn from(outcome: LendingOutcome) -> Self {
        let message = match outcome.state.status {
            LendingStatus::CheckedOut => "book_checked_out",
            LendingStatus::CheckedIn => "book_checked_in",
        };
        Self {
            status: outcome.state.status,
            message: message.to_string(),
            outcome,
        }
    }
}

/// Check an item out, or in if it is already out
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = LendingRequest,
    responses(
        (status = 200, description = "Item checked out or in", body = LendingResponse),
        (status = 400, description = "Invalid ISBN"),
        (status = 404, description = "Item not in the library"),
        (status = 503, description = "Storage unavailable, retry")
    )
)]
pub async fn checkout_or_checkin(
    State(state): State<crate::AppState>,
    Json(request): Json<LendingRequest>,
) -> AppResult<Json<LendingResponse>> {
    let outcome = state
        .services
        .loans
        .checkout_or_checkin(&request.isbn, &request.username)
        .await?;
    Ok(Json(outcome.into()))
}

/// Check an item out
#[utoipa::path(
    post,
    path = "/items/{isbn}/checkout",
    tag = "loans",
    params(
        ("isbn" = String, Path, description = "Item ISBN")
    ),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Item checked out", body = LendingResponse),
        (status = 404, description = "Item not in the library"),
        (status = 409, description = "Item is already checked out")
    )
)]
pub async fn check_out(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
    Json(request): Json<ActorRequest>,
) -> AppResult<Json<LendingResponse>> {
    let outcome = state.services.loans.check_out(&isbn, &request.username).await?;
    Ok(Json(outcome.into()))
}

/// Check an item in
#[utoipa::path(
    post,
    path = "/items/{isbn}/checkin",
    tag = "loans",
    params(
        ("isbn" = String, Path, description = "Item ISBN")
    ),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Item checked in", body = LendingResponse),
        (status = 404, description = "Item not in the library"),
        (status = 409, description = "Item is already checked in")
    )
)]
pub async fn check_in(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
    Json(request): Json<ActorRequest>,
) -> AppResult<Json<LendingResponse>> {
    let outcome = state.services.loans.check_in(&isbn, &request.username).await?;
    Ok(Json(outcome.into()))
}
