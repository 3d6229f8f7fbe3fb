use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{
        session::SessionView,
        stats::{DecksResponse, StatsResponse},
    },
    error::AppError,
    services::stats_service,
    state::SharedState,
};

/// Read-only statistics endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/decks", get(list_decks))
        .route("/stats", get(get_stats).delete(reset_stats))
}

/// Deck labels with card counts and baseline rates.
#[utoipa::path(
    get,
    path = "/decks",
    tag = "stats",
    responses((status = 200, description = "Available decks", body = DecksResponse))
)]
pub async fn list_decks(State(state): State<SharedState>) -> Json<DecksResponse> {
    Json(stats_service::deck_summaries(&state).await)
}

/// Totals per deck, overall totals, streak and trend.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses((status = 200, description = "Player statistics", body = StatsResponse))
)]
pub async fn get_stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    Json(stats_service::stats_overview(&state).await)
}

/// Clear this device's totals, outbox and answered cards.
#[utoipa::path(
    delete,
    path = "/stats",
    tag = "stats",
    responses((status = 200, description = "Local stats cleared", body = SessionView))
)]
pub async fn reset_stats(State(state): State<SharedState>) -> Result<Json<SessionView>, AppError> {
    Ok(Json(stats_service::reset_local(&state).await?))
}
