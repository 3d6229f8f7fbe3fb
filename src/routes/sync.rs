use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::sync::{SyncResponse, SyncStatusDto},
    error::AppError,
    services::auth_service,
    state::SharedState,
};

/// Sync indicator and manual reconciliation.
pub fn router() -> Router<SharedState> {
    Router::new().route("/sync", get(get_sync_status).post(trigger_sync))
}

/// Current sync indicator.
#[utoipa::path(
    get,
    path = "/sync",
    tag = "sync",
    responses((status = 200, description = "Sync status", body = SyncStatusDto))
)]
pub async fn get_sync_status(State(state): State<SharedState>) -> Json<SyncStatusDto> {
    Json(state.sync_status().into())
}

/// Reconcile the signed-in user again and wait for the report.
#[utoipa::path(
    post,
    path = "/sync",
    tag = "sync",
    responses(
        (status = 200, description = "Reconciliation finished", body = SyncResponse),
        (status = 401, description = "Nobody is signed in"),
        (status = 409, description = "A reconciliation is already running"),
        (status = 503, description = "Remote store unreachable")
    )
)]
pub async fn trigger_sync(
    State(state): State<SharedState>,
) -> Result<Json<SyncResponse>, AppError> {
    let report = auth_service::resync(&state).await?;
    Ok(Json(SyncResponse {
        report: report.into(),
        status: state.sync_status().into(),
    }))
}
