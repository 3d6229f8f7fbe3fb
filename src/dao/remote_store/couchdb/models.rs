use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{AnswerChoice, CardAnswer, DeckStats, UserId};

pub const STATS_PREFIX: &str = "stats::";
pub const ANSWER_PREFIX: &str = "answer::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Deck totals row, one per `(user, deck)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDeckStatsDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: DeckStatsBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckStatsBody {
    pub user_id: UserId,
    pub deck: String,
    pub cards_played: u32,
    pub total_correct: u32,
    pub total_wrong: u32,
    pub updated_at: SystemTime,
}

impl CouchDeckStatsDocument {
    pub fn new(user: UserId, deck: String, stats: DeckStats, rev: Option<String>) -> Self {
        Self {
            id: stats_doc_id(&user, &deck),
            rev,
            body: DeckStatsBody {
                user_id: user,
                deck,
                cards_played: stats.cards_played,
                total_correct: stats.total_correct,
                total_wrong: stats.total_wrong,
                updated_at: SystemTime::now(),
            },
        }
    }

    pub fn belongs_to(&self, user: &UserId) -> bool {
        &self.body.user_id == user
    }

    pub fn into_entry(self) -> (String, DeckStats) {
        (
            self.body.deck,
            DeckStats {
                cards_played: self.body.cards_played,
                total_correct: self.body.total_correct,
                total_wrong: self.body.total_wrong,
            },
        )
    }
}

/// Write-once answer record. The document id embeds the answer id, so a retried insert
/// collides with the first one instead of creating a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchAnswerDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub body: AnswerBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerBody {
    pub user_id: UserId,
    pub answer_id: Uuid,
    pub card_id: String,
    pub deck: String,
    pub answer: AnswerChoice,
    pub correct: bool,
    pub answered_at: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    pub recorded_at: SystemTime,
}

impl CouchAnswerDocument {
    pub fn new(user: UserId, answer: CardAnswer) -> Self {
        Self {
            id: answer_doc_id(&user, answer.id),
            body: AnswerBody {
                user_id: user,
                answer_id: answer.id,
                card_id: answer.card_id,
                deck: answer.deck,
                answer: answer.answer,
                correct: answer.correct,
                answered_at: answer.answered_at,
                response_time_ms: answer.response_time_ms,
                recorded_at: SystemTime::now(),
            },
        }
    }

    pub fn belongs_to(&self, user: &UserId) -> bool {
        &self.body.user_id == user
    }
}

impl From<CouchAnswerDocument> for CardAnswer {
    fn from(doc: CouchAnswerDocument) -> Self {
        CardAnswer {
            id: doc.body.answer_id,
            card_id: doc.body.card_id,
            deck: doc.body.deck,
            answer: doc.body.answer,
            correct: doc.body.correct,
            answered_at: doc.body.answered_at,
            response_time_ms: doc.body.response_time_ms,
        }
    }
}

pub fn stats_prefix(user: &UserId) -> String {
    format!("{}{}::", STATS_PREFIX, user)
}

pub fn answer_prefix(user: &UserId) -> String {
    format!("{}{}::", ANSWER_PREFIX, user)
}

pub fn stats_doc_id(user: &UserId, deck: &str) -> String {
    format!("{}{}", stats_prefix(user), deck)
}

pub fn answer_doc_id(user: &UserId, answer_id: Uuid) -> String {
    format!("{}{}", answer_prefix(user), answer_id)
}
