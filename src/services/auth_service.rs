//! Sign-in and sign-out events raised by the authentication provider bridge.

use tracing::info;

use crate::{
    dao::models::UserId,
    dto::{auth::AuthResponse, sync::SyncStatusDto},
    error::ServiceError,
    services::{
        sse_events,
        sync_engine::{self, SyncError, SyncReport},
    },
    state::{SharedState, sync::Identity},
};

/// Record a sign-in and start reconciling when the remote store is reachable.
///
/// A repeated sign-in for a user already reconciled is a no-op; switching users resets the
/// guard so the new user is reconciled too.
pub async fn sign_in(state: &SharedState, user: UserId) -> AuthResponse {
    let previous = state.set_identity(Identity::Authenticated(user.clone()));
    if previous.user() != Some(&user) {
        state.sync_guard().lock().await.reset();
        if previous.user().is_some() {
            // Switching accounts: start from a clean indicator for the new user.
            let status = state.update_sync_status(|status| *status = Default::default());
            sse_events::broadcast_sync_status(state, &status);
        }
        info!(user = %user, "signed in");
    }

    let sync_started = should_start_sync(state, &user).await;
    if sync_started {
        sync_engine::spawn_sync(state.clone(), user.clone(), false);
    }

    AuthResponse {
        user_id: Some(user.to_string()),
        sync_started,
        sync: SyncStatusDto::from(state.sync_status()),
    }
}

/// Detach the remote identity. The local store is left untouched.
pub async fn sign_out(state: &SharedState) -> AuthResponse {
    let previous = state.set_identity(Identity::Anonymous);
    state.sync_guard().lock().await.reset();
    let status = state.update_sync_status(|status| *status = Default::default());
    sse_events::broadcast_sync_status(state, &status);

    if let Some(user) = previous.user() {
        info!(user = %user, "signed out");
    }

    AuthResponse {
        user_id: None,
        sync_started: false,
        sync: SyncStatusDto::from(status),
    }
}

/// Reconcile the signed-in user now, even when already reconciled, and wait for the result.
pub async fn resync(state: &SharedState) -> Result<SyncReport, ServiceError> {
    let user = state
        .identity()
        .user()
        .cloned()
        .ok_or(SyncError::Anonymous)?;
    Ok(sync_engine::run_sync(state, user, true).await?)
}

/// Called when a remote store becomes reachable: reconcile a signed-in user not yet synced.
pub async fn reevaluate(state: &SharedState) -> bool {
    let Some(user) = state.identity().user().cloned() else {
        return false;
    };
    let started = should_start_sync(state, &user).await;
    if started {
        sync_engine::spawn_sync(state.clone(), user, false);
    }
    started
}

async fn should_start_sync(state: &SharedState, user: &UserId) -> bool {
    if state.is_degraded().await {
        return false;
    }
    let guard = state.sync_guard().lock().await;
    !guard.is_in_flight() && !guard.is_synced_for(user)
}
