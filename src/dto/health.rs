use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of cards in the loaded catalog.
    pub cards: usize,
}

impl HealthResponse {
    /// Create a health response indicating the remote store is reachable.
    pub fn ok(cards: usize) -> Self {
        Self {
            status: "ok".to_string(),
            cards,
        }
    }

    /// Create a health response indicating the service runs without its remote store.
    pub fn degraded(cards: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            cards,
        }
    }
}
