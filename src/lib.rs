//! Library crate for trialcards-sync, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Local and remote persistence.
pub mod dao;
/// HTTP and SSE payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routers.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;
