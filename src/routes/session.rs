use axum::{Json, Router, extract::State, routing::{get, post}};
use axum_valid::Valid;

use crate::{
    dto::session::{AnswerRequest, AnswerResponse, ChangeDeckRequest, SessionView},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Play session endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/answer", post(answer))
        .route("/session/next", post(next))
        .route("/session/deck", post(change_deck))
}

/// Current phase, card, deck totals and sync indicator.
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionView> {
    Json(session_service::current_session(&state).await)
}

/// Answer the current card and reveal its outcome.
#[utoipa::path(
    post,
    path = "/session/answer",
    tag = "session",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerResponse),
        (status = 404, description = "The active deck has no card"),
        (status = 409, description = "The current card was already answered")
    )
)]
pub async fn answer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<AnswerResponse>, AppError> {
    let response =
        session_service::submit_answer(&state, payload.answer, payload.response_time_ms).await?;
    Ok(Json(response))
}

/// Move to the next card after a reveal.
#[utoipa::path(
    post,
    path = "/session/next",
    tag = "session",
    responses(
        (status = 200, description = "Next card shown", body = SessionView),
        (status = 409, description = "The current card was not answered yet")
    )
)]
pub async fn next(State(state): State<SharedState>) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::next_card(&state).await?))
}

/// Switch to another deck, restarting on a fresh order.
#[utoipa::path(
    post,
    path = "/session/deck",
    tag = "session",
    request_body = ChangeDeckRequest,
    responses((status = 200, description = "Deck selected", body = SessionView))
)]
pub async fn change_deck(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ChangeDeckRequest>>,
) -> Result<Json<SessionView>, AppError> {
    let view = session_service::change_deck(&state, payload.deck.as_deref()).await?;
    Ok(Json(view))
}
