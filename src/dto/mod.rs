use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Sign-in and sign-out payloads.
pub mod auth;
/// Health check payload.
pub mod health;
/// Play session payloads.
pub mod session;
/// Server-sent event payloads.
pub mod sse;
/// Statistics payloads.
pub mod stats;
/// Reconciliation payloads.
pub mod sync;
/// Validators shared by request payloads.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
