/// CouchDB-backed remote store.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process remote store.
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{
    models::{AnswerQuery, CardAnswer, DeckStats, DeckStatsMap, UserId},
    storage::StorageResult,
};

/// Remote persistence for an authenticated identity's stats and answer history.
///
/// Deck rows are upserted on `(user, deck)`; answers are append-only and re-inserting an answer
/// with an id the store already holds succeeds without creating a second record.
pub trait RemoteStatsStore: Send + Sync {
    fn upsert_deck_stats(
        &self,
        user: UserId,
        deck: String,
        stats: DeckStats,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn insert_card_answer(
        &self,
        user: UserId,
        answer: CardAnswer,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn fetch_deck_stats(&self, user: UserId) -> BoxFuture<'static, StorageResult<DeckStatsMap>>;
    /// Answers for `user`, most recent first.
    fn fetch_card_answers(
        &self,
        user: UserId,
        query: AnswerQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<CardAnswer>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
