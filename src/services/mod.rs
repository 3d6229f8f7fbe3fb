/// Sign-in and sign-out handling.
pub mod auth_service;
/// Play-order derivation from the catalog.
pub mod deck_selector;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Remote store connection supervisor with backoff and health polling.
pub mod remote_supervisor;
/// Session operations and the best-effort remote push.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Accuracy, streak, trend and baseline computations.
pub mod stats;
/// Deck and stats overviews for the UI.
pub mod stats_service;
/// Local/remote reconciliation.
pub mod sync_engine;
