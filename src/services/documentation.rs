use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trial cards service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::get_session,
        crate::routes::session::answer,
        crate::routes::session::next,
        crate::routes::session::change_deck,
        crate::routes::stats::list_decks,
        crate::routes::stats::get_stats,
        crate::routes::stats::reset_stats,
        crate::routes::sync::get_sync_status,
        crate::routes::sync::trigger_sync,
        crate::routes::auth::sign_in,
        crate::routes::auth::sign_out,
        crate::routes::sse::event_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::AnswerRequest,
            crate::dto::session::ChangeDeckRequest,
            crate::dto::session::SessionView,
            crate::dto::session::AnswerResponse,
            crate::dto::stats::StatsResponse,
            crate::dto::stats::DecksResponse,
            crate::dto::sync::SyncStatusDto,
            crate::dto::sync::SyncResponse,
            crate::dto::auth::SignInRequest,
            crate::dto::auth::AuthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::StatsSnapshotEvent,
            crate::dto::sse::SessionChangedEvent,
            crate::dao::models::DeckStats,
            crate::dao::models::AnswerChoice,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Play session"),
        (name = "stats", description = "Deck and player statistics"),
        (name = "sync", description = "Local/remote reconciliation"),
        (name = "auth", description = "Authentication events"),
        (name = "sse", description = "Server-sent events stream"),
    )
)]
/// OpenAPI document of the HTTP API.
pub struct ApiDoc;
