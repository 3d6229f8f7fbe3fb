use std::{fmt, time::SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Sentinel deck label used when no deck filter is active.
pub const ALL_DECK: &str = "All";

/// Per-deck statistics keyed by deck label, in insertion order.
pub type DeckStatsMap = IndexMap<String, DeckStats>;

/// Stable opaque identifier handed out by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Choice submitted by a player for a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerChoice {
    /// The intervention succeeded on its primary outcome.
    Yes,
    /// The intervention did not succeed.
    No,
}

impl AnswerChoice {
    /// Boolean reading of the choice (`Yes` is `true`).
    pub fn as_bool(self) -> bool {
        matches!(self, AnswerChoice::Yes)
    }
}

impl From<bool> for AnswerChoice {
    fn from(value: bool) -> Self {
        if value {
            AnswerChoice::Yes
        } else {
            AnswerChoice::No
        }
    }
}

/// Running totals for one deck context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeckStats {
    /// Number of answers recorded for the deck.
    pub cards_played: u32,
    /// Number of answers matching the ground truth.
    pub total_correct: u32,
    /// Number of answers not matching the ground truth.
    pub total_wrong: u32,
}

impl DeckStats {
    /// Count one more answer.
    pub fn record(&mut self, correct: bool) {
        self.cards_played = self.cards_played.saturating_add(1);
        if correct {
            self.total_correct = self.total_correct.saturating_add(1);
        } else {
            self.total_wrong = self.total_wrong.saturating_add(1);
        }
    }

    /// Whether `cards_played` matches the correct/wrong split.
    pub fn is_consistent(&self) -> bool {
        u64::from(self.cards_played) == u64::from(self.total_correct) + u64::from(self.total_wrong)
    }

    /// Sum of two sets of totals.
    pub fn combined(self, other: DeckStats) -> DeckStats {
        DeckStats {
            cards_played: self.cards_played.saturating_add(other.cards_played),
            total_correct: self.total_correct.saturating_add(other.total_correct),
            total_wrong: self.total_wrong.saturating_add(other.total_wrong),
        }
    }
}

/// One answered card. Locally this is an outbox entry until the remote store confirms it;
/// remotely it is the durable answer history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAnswer {
    /// Event identifier, stable across upload retries.
    pub id: Uuid,
    /// Identifier of the answered card.
    pub card_id: String,
    /// Deck context active when the card was answered.
    pub deck: String,
    /// Choice submitted by the player.
    pub answer: AnswerChoice,
    /// Whether the choice matched the card outcome.
    pub correct: bool,
    /// When the answer was recorded.
    pub answered_at: SystemTime,
    /// Time between the card being shown and the answer, when the client reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

/// Filters accepted when reading answer history back from the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerQuery {
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Restrict the history to one deck context.
    pub deck: Option<String>,
}

impl AnswerQuery {
    /// Most recent `limit` answers across all decks.
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            deck: None,
        }
    }
}

/// Order answers most recent first, breaking ties on the event id so the order is stable.
pub fn sort_most_recent_first(answers: &mut [CardAnswer]) {
    answers.sort_by(|a, b| {
        b.answered_at
            .cmp(&a.answered_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn record_keeps_totals_consistent() {
        let mut stats = DeckStats::default();
        for correct in [true, false, true, true, false] {
            stats.record(correct);
            assert!(stats.is_consistent());
        }
        assert_eq!(
            stats,
            DeckStats {
                cards_played: 5,
                total_correct: 3,
                total_wrong: 2,
            }
        );
    }

    #[test]
    fn answers_sort_most_recent_first() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let answer = |secs: u64| CardAnswer {
            id: Uuid::new_v4(),
            card_id: format!("card-{secs}"),
            deck: ALL_DECK.into(),
            answer: AnswerChoice::Yes,
            correct: true,
            answered_at: base + Duration::from_secs(secs),
            response_time_ms: None,
        };
        let mut answers = vec![answer(1), answer(3), answer(2)];
        sort_most_recent_first(&mut answers);
        let ids: Vec<_> = answers.iter().map(|a| a.card_id.as_str()).collect();
        assert_eq!(ids, ["card-3", "card-2", "card-1"]);
    }
}
