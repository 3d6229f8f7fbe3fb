use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::DeckStats,
    dto::session::AnswerView,
    services::stats::{StatsView, accuracy},
};

/// Totals and derived views for one deck context.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsViewDto {
    /// Answers given in the deck.
    pub cards_played: u32,
    /// Correct answers.
    pub total_correct: u32,
    /// Wrong answers.
    pub total_wrong: u32,
    /// Percentage of correct answers.
    pub accuracy: u32,
    /// Consecutive correct answers, most recent first.
    pub current_streak: u32,
    /// Accuracy of the last 10 answers minus the 10 before them.
    pub trend: i32,
    /// Share of successful trials in the deck.
    pub baseline_rate: u32,
}

impl From<StatsView> for StatsViewDto {
    fn from(view: StatsView) -> Self {
        Self {
            cards_played: view.stats.cards_played,
            total_correct: view.stats.total_correct,
            total_wrong: view.stats.total_wrong,
            accuracy: view.accuracy,
            current_streak: view.current_streak,
            trend: view.trend,
            baseline_rate: view.baseline_rate,
        }
    }
}

/// Totals of one deck with their accuracy.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeckTotalsDto {
    /// Raw totals.
    #[serde(flatten)]
    pub stats: DeckStats,
    /// Percentage of correct answers.
    pub accuracy: u32,
}

impl From<DeckStats> for DeckTotalsDto {
    fn from(stats: DeckStats) -> Self {
        Self {
            accuracy: accuracy(&stats),
            stats,
        }
    }
}

/// Response of `GET /stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Totals keyed by deck label.
    pub decks: IndexMap<String, DeckTotalsDto>,
    /// Totals summed over every deck.
    pub overall: DeckTotalsDto,
    /// Consecutive correct answers.
    pub current_streak: u32,
    /// Accuracy change over the last answers.
    pub trend: i32,
    /// Recent answers, most recent first.
    pub recent: Vec<AnswerView>,
}

/// Deck picker entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeckSummary {
    /// Deck label.
    pub label: String,
    /// Cards in the deck.
    pub cards: usize,
    /// Share of successful trials in the deck.
    pub baseline_rate: u32,
    /// Answers given in the deck.
    pub cards_played: u32,
}

/// Response of `GET /decks`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DecksResponse {
    /// The whole-catalog deck first, then labels in catalog order.
    pub decks: Vec<DeckSummary>,
}
