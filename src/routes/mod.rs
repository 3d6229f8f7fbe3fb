use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// `/auth` routes.
pub mod auth;
/// `/healthcheck` route.
pub mod health;
/// `/session` routes.
pub mod session;
/// `/sse` stream.
pub mod sse;
/// `/stats` and `/decks` routes.
pub mod stats;
/// `/sync` routes.
pub mod sync;

/// Compose the API route trees and the Swagger UI, then attach the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let docs: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into();

    health::router()
        .merge(session::router())
        .merge(stats::router())
        .merge(sync::router())
        .merge(auth::router())
        .merge(sse::router())
        .merge(docs)
        .with_state(state)
}
