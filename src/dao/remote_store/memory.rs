//! In-process remote store, used for local development and by the test suites.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    models::{AnswerQuery, CardAnswer, DeckStats, DeckStatsMap, UserId, sort_most_recent_first},
    remote_store::RemoteStatsStore,
    storage::StorageResult,
};

/// Remote store keeping every row in concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    decks: Arc<DashMap<(UserId, String), DeckStats>>,
    answers: Arc<DashMap<UserId, Vec<CardAnswer>>>,
}

impl MemoryRemoteStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of answers held for `user`.
    pub fn answer_count(&self, user: &UserId) -> usize {
        self.answers.get(user).map(|list| list.len()).unwrap_or(0)
    }

    fn deck_rows(&self, user: &UserId) -> DeckStatsMap {
        let mut rows: Vec<(String, DeckStats)> = self
            .decks
            .iter()
            .filter(|entry| &entry.key().0 == user)
            .map(|entry| (entry.key().1.clone(), *entry.value()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows.into_iter().collect()
    }

    fn history(&self, user: &UserId, query: &AnswerQuery) -> Vec<CardAnswer> {
        let mut answers: Vec<CardAnswer> = self
            .answers
            .get(user)
            .map(|list| {
                list.iter()
                    .filter(|answer| query.deck.as_ref().is_none_or(|deck| &answer.deck == deck))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_most_recent_first(&mut answers);
        if let Some(limit) = query.limit {
            answers.truncate(limit);
        }
        answers
    }
}

impl RemoteStatsStore for MemoryRemoteStore {
    fn upsert_deck_stats(
        &self,
        user: UserId,
        deck: String,
        stats: DeckStats,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.decks.insert((user, deck), stats);
            Ok(())
        })
    }

    fn insert_card_answer(
        &self,
        user: UserId,
        answer: CardAnswer,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut list = store.answers.entry(user).or_default();
            if !list.iter().any(|existing| existing.id == answer.id) {
                list.push(answer);
            }
            Ok(())
        })
    }

    fn fetch_deck_stats(&self, user: UserId) -> BoxFuture<'static, StorageResult<DeckStatsMap>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.deck_rows(&user)) })
    }

    fn fetch_card_answers(
        &self,
        user: UserId,
        query: AnswerQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<CardAnswer>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.history(&user, &query)) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use uuid::Uuid;

    use super::*;
    use crate::dao::models::AnswerChoice;

    fn answer(card_id: &str, deck: &str, secs: u64) -> CardAnswer {
        CardAnswer {
            id: Uuid::new_v4(),
            card_id: card_id.into(),
            deck: deck.into(),
            answer: AnswerChoice::No,
            correct: false,
            answered_at: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            response_time_ms: None,
        }
    }

    #[tokio::test]
    async fn reinserting_an_answer_is_idempotent() {
        let store = MemoryRemoteStore::new();
        let user = UserId::new("u1");
        let recorded = answer("c1", "All", 1);

        store
            .insert_card_answer(user.clone(), recorded.clone())
            .await
            .unwrap();
        store
            .insert_card_answer(user.clone(), recorded)
            .await
            .unwrap();

        assert_eq!(store.answer_count(&user), 1);
    }

    #[tokio::test]
    async fn history_is_most_recent_first_and_filtered() {
        let store = MemoryRemoteStore::new();
        let user = UserId::new("u1");
        for (card, deck, secs) in [
            ("c1", "Exercise", 1),
            ("c2", "Nutrition", 2),
            ("c3", "Exercise", 3),
        ] {
            store
                .insert_card_answer(user.clone(), answer(card, deck, secs))
                .await
                .unwrap();
        }

        let all = store
            .fetch_card_answers(user.clone(), AnswerQuery::default())
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|a| a.card_id.as_str()).collect();
        assert_eq!(ids, ["c3", "c2", "c1"]);

        let exercise = store
            .fetch_card_answers(
                user,
                AnswerQuery {
                    limit: Some(1),
                    deck: Some("Exercise".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(exercise.len(), 1);
        assert_eq!(exercise[0].card_id, "c3");
    }

    #[tokio::test]
    async fn deck_rows_are_scoped_to_the_user() {
        let store = MemoryRemoteStore::new();
        let stats = DeckStats {
            cards_played: 1,
            total_correct: 1,
            total_wrong: 0,
        };
        store
            .upsert_deck_stats(UserId::new("a"), "All".into(), stats)
            .await
            .unwrap();
        store
            .upsert_deck_stats(UserId::new("b"), "All".into(), DeckStats::default())
            .await
            .unwrap();

        let rows = store.fetch_deck_stats(UserId::new("a")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["All"], stats);
    }
}
