use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dao::models::UserId,
    dto::auth::{AuthResponse, SignInRequest},
    services::auth_service,
    state::SharedState,
};

/// Authentication events raised by the provider bridge.
pub fn router() -> Router<SharedState> {
    Router::new().route("/auth/session", post(sign_in).delete(sign_out))
}

/// Record a sign-in; reconciliation starts in the background when the remote store is up.
#[utoipa::path(
    post,
    path = "/auth/session",
    tag = "auth",
    request_body = SignInRequest,
    responses((status = 200, description = "Signed in", body = AuthResponse))
)]
pub async fn sign_in(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SignInRequest>>,
) -> Json<AuthResponse> {
    Json(auth_service::sign_in(&state, UserId::new(payload.user_id)).await)
}

/// Record a sign-out. Local progress is kept.
#[utoipa::path(
    delete,
    path = "/auth/session",
    tag = "auth",
    responses((status = 200, description = "Signed out", body = AuthResponse))
)]
pub async fn sign_out(State(state): State<SharedState>) -> Json<AuthResponse> {
    Json(auth_service::sign_out(&state).await)
}
