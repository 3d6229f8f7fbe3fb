//! Device-local stats store.
//!
//! Reads never fail: an absent, corrupt or unreadable record loads as its zero value. Writes are
//! best effort: a failed write is logged and the record is kept in process memory, where later
//! reads find it until a write of the same record reaches the backend again.

mod backend;
mod schema;

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{
    merge::merge_deck_stats,
    models::{CardAnswer, DeckStatsMap},
};

pub use backend::{FileBackend, KeyValueBackend, LocalStoreError, LocalStoreResult, MemoryBackend};
pub use schema::{
    AnsweredCardIdsRecord, DeckStatsRecord, PendingAnswersRecord, RecordKind, SCHEMA_VERSION,
};

/// Stored state after one recorded answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAnswer {
    /// Per-deck totals including the answer.
    pub deck_stats: DeckStatsMap,
    /// Answered set including the answer's card.
    pub answered: BTreeSet<String>,
    /// Whether every write reached the backend.
    pub persisted: bool,
}

/// Local persistence for deck stats, the pending-answer outbox and the answered-card set.
pub struct LocalStatsStore {
    backend: Box<dyn KeyValueBackend>,
    // Serializes load-modify-save cycles so concurrent callers cannot interleave them.
    write_gate: Mutex<()>,
    // Encoded records whose last backend write failed, keyed by record key.
    unsaved: Mutex<HashMap<&'static str, String>>,
}

impl LocalStatsStore {
    /// Wrap a key-value backend.
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            write_gate: Mutex::new(()),
            unsaved: Mutex::new(HashMap::new()),
        }
    }

    /// Store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Load a record, falling back to its zero value when absent or unreadable.
    ///
    /// A record whose last write failed is served from memory instead of the backend.
    pub fn load<R: RecordKind>(&self) -> R::Value {
        let unsaved = self.unsaved().get(R::KEY).cloned();
        let read = match unsaved {
            Some(raw) => Ok(Some(raw)),
            None => self.backend.read(R::KEY),
        };
        match read {
            Ok(Some(raw)) => match schema::decode(&raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(key = R::KEY, error = %err, "discarding unreadable local record");
                    R::Value::default()
                }
            },
            Ok(None) => R::Value::default(),
            Err(err) => {
                warn!(key = R::KEY, error = %err, "local storage unavailable; using empty record");
                R::Value::default()
            }
        }
    }

    /// Persist a record. Returns whether the write reached the backend.
    pub fn save<R: RecordKind>(&self, value: &R::Value) -> bool {
        let _gate = self.gate();
        self.save_locked::<R>(value)
    }

    /// Current per-deck totals.
    pub fn deck_stats(&self) -> DeckStatsMap {
        self.load::<DeckStatsRecord>()
    }

    /// Answers waiting for remote confirmation, oldest first.
    pub fn pending_answers(&self) -> Vec<CardAnswer> {
        self.load::<PendingAnswersRecord>()
    }

    /// Card identifiers already answered.
    pub fn answered_card_ids(&self) -> BTreeSet<String> {
        self.load::<AnsweredCardIdsRecord>()
    }

    /// Apply one answer to the stored records in a single critical section.
    ///
    /// The answer's deck entry is incremented on the stored totals, so progress merged in by a
    /// reconciliation the caller has not seen yet is kept.
    pub fn record_answer(&self, answer: &CardAnswer) -> RecordedAnswer {
        let _gate = self.gate();

        let mut deck_stats = self.load::<DeckStatsRecord>();
        deck_stats
            .entry(answer.deck.clone())
            .or_default()
            .record(answer.correct);

        let mut pending = self.load::<PendingAnswersRecord>();
        pending.push(answer.clone());

        let mut answered = self.load::<AnsweredCardIdsRecord>();
        answered.insert(answer.card_id.clone());

        let stats_saved = self.save_locked::<DeckStatsRecord>(&deck_stats);
        let pending_saved = self.save_locked::<PendingAnswersRecord>(&pending);
        let answered_saved = self.save_locked::<AnsweredCardIdsRecord>(&answered);
        RecordedAnswer {
            deck_stats,
            answered,
            persisted: stats_saved && pending_saved && answered_saved,
        }
    }

    /// Drop the given answers from the outbox, keeping anything recorded since they were read.
    ///
    /// Returns the number of answers removed.
    pub fn remove_pending(&self, ids: &HashSet<Uuid>) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let _gate = self.gate();
        let mut pending = self.load::<PendingAnswersRecord>();
        let before = pending.len();
        pending.retain(|answer| !ids.contains(&answer.id));
        let removed = before - pending.len();
        if removed > 0 {
            self.save_locked::<PendingAnswersRecord>(&pending);
        }
        debug!(removed, remaining = pending.len(), "acknowledged pending answers");
        removed
    }

    /// Merge `incoming` into the stored deck map with the progress rule and persist the result.
    ///
    /// Re-reading under the gate keeps answers recorded while `incoming` was being computed.
    pub fn merge_deck_stats(&self, incoming: &DeckStatsMap) -> DeckStatsMap {
        let _gate = self.gate();
        let current = self.load::<DeckStatsRecord>();
        let merged = merge_deck_stats(&current, incoming).merged;
        self.save_locked::<DeckStatsRecord>(&merged);
        merged
    }

    /// Union `ids` into the stored answered set and persist the result.
    pub fn union_answered<I>(&self, ids: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = String>,
    {
        let _gate = self.gate();
        let mut answered = self.load::<AnsweredCardIdsRecord>();
        answered.extend(ids);
        self.save_locked::<AnsweredCardIdsRecord>(&answered);
        answered
    }

    /// Remove every record.
    pub fn clear(&self) {
        let _gate = self.gate();
        for key in [
            DeckStatsRecord::KEY,
            PendingAnswersRecord::KEY,
            AnsweredCardIdsRecord::KEY,
        ] {
            if let Err(err) = self.backend.remove(key) {
                warn!(key, error = %err, "failed to clear local record");
            }
        }
        self.unsaved().clear();
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn unsaved(&self) -> MutexGuard<'_, HashMap<&'static str, String>> {
        self.unsaved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save_locked<R: RecordKind>(&self, value: &R::Value) -> bool {
        let raw = match schema::encode(value) {
            Ok(raw) => raw,
            Err(source) => {
                let err = LocalStoreError::Encode {
                    key: R::KEY.to_string(),
                    source,
                };
                warn!(key = R::KEY, error = %err, "failed to encode local record");
                return false;
            }
        };

        match self.backend.write(R::KEY, &raw) {
            Ok(()) => {
                self.unsaved().remove(R::KEY);
                true
            }
            Err(err) => {
                warn!(
                    key = R::KEY,
                    error = %err,
                    "local write failed; continuing with in-memory state"
                );
                self.unsaved().insert(R::KEY, raw);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::dao::models::{AnswerChoice, DeckStats};

    /// Shares one memory backend between the store under test and the assertions.
    struct SharedBackend(Arc<MemoryBackend>);

    impl KeyValueBackend for SharedBackend {
        fn read(&self, key: &str) -> LocalStoreResult<Option<String>> {
            self.0.read(key)
        }
        fn write(&self, key: &str, value: &str) -> LocalStoreResult<()> {
            self.0.write(key, value)
        }
        fn remove(&self, key: &str) -> LocalStoreResult<()> {
            self.0.remove(key)
        }
    }

    fn store() -> (LocalStatsStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (
            LocalStatsStore::new(SharedBackend(backend.clone())),
            backend,
        )
    }

    fn answer(card_id: &str) -> CardAnswer {
        CardAnswer {
            id: Uuid::new_v4(),
            card_id: card_id.into(),
            deck: "All".into(),
            answer: AnswerChoice::Yes,
            correct: true,
            answered_at: SystemTime::now(),
            response_time_ms: Some(1_200),
        }
    }

    #[test]
    fn missing_records_load_as_empty() {
        let (store, _) = store();
        assert!(store.deck_stats().is_empty());
        assert!(store.pending_answers().is_empty());
        assert!(store.answered_card_ids().is_empty());
    }

    #[test]
    fn corrupt_records_load_as_empty() {
        let (store, backend) = store();
        backend.insert_raw(DeckStatsRecord::KEY, "{not json");
        backend.insert_raw(PendingAnswersRecord::KEY, r#"{"version": 7, "data": []}"#);
        backend.insert_raw(AnsweredCardIdsRecord::KEY, r#"{"version": 1, "data": 3}"#);

        assert!(store.deck_stats().is_empty());
        assert!(store.pending_answers().is_empty());
        assert!(store.answered_card_ids().is_empty());
    }

    #[test]
    fn record_answer_persists_all_three_records() {
        let (store, _) = store();
        let recorded = answer("NCT001");

        let outcome = store.record_answer(&recorded);

        assert!(outcome.persisted);
        assert_eq!(outcome.deck_stats["All"].cards_played, 1);
        assert_eq!(store.deck_stats(), outcome.deck_stats);
        assert_eq!(store.pending_answers(), vec![recorded]);
        assert!(store.answered_card_ids().contains("NCT001"));
    }

    #[test]
    fn record_answer_increments_totals_merged_behind_the_caller() {
        let (store, _) = store();
        store.record_answer(&answer("a"));
        store.merge_deck_stats(&DeckStatsMap::from_iter([(
            "All".to_string(),
            DeckStats {
                cards_played: 15,
                total_correct: 9,
                total_wrong: 6,
            },
        )]));

        let outcome = store.record_answer(&answer("b"));

        assert_eq!(outcome.deck_stats["All"].cards_played, 16);
        assert_eq!(outcome.deck_stats["All"].total_correct, 10);
        assert_eq!(store.deck_stats()["All"].cards_played, 16);
    }

    #[test]
    fn rejected_writes_are_served_from_memory() {
        let (store, backend) = store();
        backend.set_reject_writes(true);

        let recorded = answer("NCT001");
        let outcome = store.record_answer(&recorded);
        assert!(!outcome.persisted);
        assert_eq!(backend.read(DeckStatsRecord::KEY).unwrap(), None);

        assert_eq!(store.deck_stats()["All"].cards_played, 1);
        assert_eq!(store.pending_answers(), vec![recorded.clone()]);
        assert!(store.answered_card_ids().contains("NCT001"));

        backend.set_reject_writes(false);
        assert_eq!(store.remove_pending(&HashSet::from([recorded.id])), 1);
        assert!(store.pending_answers().is_empty());
        assert!(backend.read(PendingAnswersRecord::KEY).unwrap().is_some());
    }

    #[test]
    fn remove_pending_keeps_answers_not_listed() {
        let (store, _) = store();
        let first = answer("a");
        let second = answer("b");
        store.record_answer(&first);
        store.record_answer(&second);

        let removed = store.remove_pending(&HashSet::from([first.id]));
        assert_eq!(removed, 1);
        assert_eq!(store.pending_answers(), vec![second]);
    }

    #[test]
    fn merge_keeps_local_progress_made_meanwhile() {
        let (store, _) = store();
        let mut local = DeckStatsMap::new();
        local.insert(
            "All".into(),
            DeckStats {
                cards_played: 4,
                total_correct: 4,
                total_wrong: 0,
            },
        );
        store.save::<DeckStatsRecord>(&local);

        let mut incoming = DeckStatsMap::new();
        incoming.insert(
            "All".into(),
            DeckStats {
                cards_played: 3,
                total_correct: 1,
                total_wrong: 2,
            },
        );
        incoming.insert("Exercise".into(), DeckStats::default());

        let merged = store.merge_deck_stats(&incoming);
        assert_eq!(merged["All"].cards_played, 4);
        assert!(merged.contains_key("Exercise"));
        assert_eq!(store.deck_stats(), merged);
    }

    #[test]
    fn clear_removes_everything() {
        let (store, _) = store();
        store.record_answer(&answer("a"));
        store.clear();
        assert!(store.deck_stats().is_empty());
        assert!(store.pending_answers().is_empty());
        assert!(store.answered_card_ids().is_empty());
    }
}
