use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the remote store and report `degraded` whenever it cannot be reached.
///
/// The service stays usable in that case: play continues against the local store.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let cards = state.catalog().len();
    let reachable = match state.remote_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "remote store health check failed");
                false
            }
        },
        None => {
            warn!("remote store unavailable (degraded mode)");
            false
        }
    };

    if reachable {
        HealthResponse::ok(cards)
    } else {
        HealthResponse::degraded(cards)
    }
}
