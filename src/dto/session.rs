use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{AnswerChoice, CardAnswer, DeckStats},
    dto::{format_system_time, stats::StatsViewDto, sync::SyncStatusDto},
    state::{
        catalog::{Card, CardMetadata},
        session_machine::SessionPhase,
    },
};

/// Upper bound accepted for a client-measured response time (one hour).
const MAX_RESPONSE_TIME_MS: u64 = 3_600_000;

/// Player's answer to the current card.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerRequest {
    /// Yes or no.
    pub answer: AnswerChoice,
    /// Milliseconds between the card being shown and the answer.
    #[serde(default)]
    #[validate(range(max = MAX_RESPONSE_TIME_MS))]
    pub response_time_ms: Option<u64>,
}

/// Deck switch request. A missing deck selects the whole catalog.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ChangeDeckRequest {
    /// Deck label to play.
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub deck: Option<String>,
}

/// Session phase as exposed to the UI.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhaseDto {
    /// Waiting for an answer.
    Question,
    /// Outcome shown; waiting for the next card.
    Reveal,
}

impl From<SessionPhase> for SessionPhaseDto {
    fn from(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Question => SessionPhaseDto::Question,
            SessionPhase::Reveal => SessionPhaseDto::Reveal,
        }
    }
}

/// Outcome and metadata of a card, only sent once it was answered.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CardReveal {
    /// Whether the trial met its primary outcome.
    pub success: bool,
    /// Trial details shown with the outcome.
    pub metadata: CardMetadata,
}

/// Card shown to the player.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CardView {
    /// Card identifier.
    pub id: String,
    /// Tested intervention.
    pub intervention: String,
    /// Measured outcome.
    pub outcome: String,
    /// Studied population, when known.
    pub population: Option<String>,
    /// Decks listing the card.
    pub decks: Vec<String>,
    /// Present in the reveal phase only.
    pub reveal: Option<CardReveal>,
}

impl CardView {
    /// Build the view of `card`, exposing its outcome only when `revealed`.
    pub fn new(card: &Card, revealed: bool) -> Self {
        Self {
            id: card.id.clone(),
            intervention: card.question.intervention.clone(),
            outcome: card.question.outcome.clone(),
            population: card.question.population.clone(),
            decks: card.decks.clone(),
            reveal: revealed.then(|| CardReveal {
                success: card.success,
                metadata: card.metadata.clone(),
            }),
        }
    }
}

/// One recorded answer.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerView {
    /// Answer identifier, unique per event.
    pub id: Uuid,
    /// Answered card.
    pub card_id: String,
    /// Deck context of the answer.
    pub deck: String,
    /// Player choice.
    pub answer: AnswerChoice,
    /// Whether the choice matched the trial outcome.
    pub correct: bool,
    /// RFC 3339 timestamp.
    pub answered_at: String,
    /// Milliseconds taken to answer.
    pub response_time_ms: Option<u64>,
}

impl From<&CardAnswer> for AnswerView {
    fn from(answer: &CardAnswer) -> Self {
        Self {
            id: answer.id,
            card_id: answer.card_id.clone(),
            deck: answer.deck.clone(),
            answer: answer.answer,
            correct: answer.correct,
            answered_at: format_system_time(answer.answered_at),
            response_time_ms: answer.response_time_ms,
        }
    }
}

/// Current play session.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    /// Current phase.
    pub phase: SessionPhaseDto,
    /// Bumped on every session change.
    pub version: u64,
    /// Active deck label.
    pub deck: String,
    /// Zero-based position in the play order.
    pub position: usize,
    /// Cards in the play order.
    pub deck_size: usize,
    /// Absent when the deck has no cards.
    pub card: Option<CardView>,
    /// Totals of the active deck.
    pub stats: StatsViewDto,
    /// Signed-in user, absent while anonymous.
    pub user_id: Option<String>,
    /// Sync indicator.
    pub sync: SyncStatusDto,
}

/// Response of `POST /session/answer`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    /// The recorded answer.
    pub answer: AnswerView,
    /// Active deck totals after the answer.
    pub totals: DeckStats,
    /// False when local storage rejected the write; the answer is then held in memory only.
    pub persisted: bool,
    /// Session after the reveal.
    pub session: SessionView,
}
