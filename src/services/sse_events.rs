use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        session::SessionPhaseDto,
        sse::{
            ServerEvent, SessionChangedEvent, StatsSnapshotEvent, SyncStatusEvent, SystemStatus,
        },
        sync::SyncStatusDto,
    },
    state::{
        SharedState,
        session::SessionTracker,
        sync::{StatsSnapshot, SyncStatus},
    },
};

/// Sync indicator changed.
pub const EVENT_SYNC_STATUS: &str = "sync.status";
/// Reconciliation published merged stats.
pub const EVENT_STATS_SNAPSHOT: &str = "stats.snapshot";
/// Play session moved.
pub const EVENT_SESSION_CHANGED: &str = "session.changed";
/// Degraded mode entered or left.
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the sync indicator.
pub fn broadcast_sync_status(state: &SharedState, status: &SyncStatus) {
    let payload = SyncStatusEvent(SyncStatusDto::from(status.clone()));
    send_event(state, EVENT_SYNC_STATUS, &payload);
}

/// Broadcast the merged stats published by a reconciliation.
pub fn broadcast_stats_snapshot(state: &SharedState, snapshot: &StatsSnapshot) {
    send_event(
        state,
        EVENT_STATS_SNAPSHOT,
        &StatsSnapshotEvent::from(snapshot),
    );
}

/// Broadcast a compact view of the session after it changed.
pub fn broadcast_session_changed(state: &SharedState, tracker: &SessionTracker) {
    let payload = SessionChangedEvent {
        version: tracker.version(),
        phase: SessionPhaseDto::from(tracker.phase()),
        deck: tracker.deck().label().to_string(),
        cards_played: tracker.active_stats().cards_played,
    };
    send_event(state, EVENT_SESSION_CHANGED, &payload);
}

/// Broadcast a degraded mode change.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
