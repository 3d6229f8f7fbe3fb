use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::DeckStats,
    dto::{
        session::{AnswerView, SessionPhaseDto},
        sync::SyncStatusDto,
    },
    state::sync::StatsSnapshot,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name; `None` sends an unnamed message.
    pub event: Option<String>,
    /// Serialized payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from a pre-serialized payload.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without its remote store.
    pub degraded: bool,
    /// Sync indicator at connection time.
    pub sync: SyncStatusDto,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether the remote store is missing.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the sync indicator changes.
pub struct SyncStatusEvent(pub SyncStatusDto);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after a successful reconciliation.
pub struct StatsSnapshotEvent {
    /// Reconciled user.
    pub user_id: String,
    /// Merged totals keyed by deck label.
    pub decks: IndexMap<String, DeckStats>,
    /// Number of distinct answered cards.
    pub answered: usize,
    /// Most recent answers first.
    pub recent: Vec<AnswerView>,
}

impl From<&StatsSnapshot> for StatsSnapshotEvent {
    fn from(snapshot: &StatsSnapshot) -> Self {
        Self {
            user_id: snapshot.user.to_string(),
            decks: snapshot.decks.clone(),
            answered: snapshot.answered.len(),
            recent: snapshot.recent.iter().map(AnswerView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the play session moves.
pub struct SessionChangedEvent {
    /// Session version after the change.
    pub version: u64,
    /// Current phase.
    pub phase: SessionPhaseDto,
    /// Active deck label.
    pub deck: String,
    /// Cards played in the active deck.
    pub cards_played: u32,
}
