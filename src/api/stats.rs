//! Statistics endpoints

use axum::{extract::State, Json};

use crate::models::stats::StatsResponse;

/// Usage statistics computed from the ledger
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse)
    )
)]
pub async fn get_stats(State(state): State<crate::AppState>) -> Json<StatsResponse> {
    Json(state.services.stats.get_stats())
}
