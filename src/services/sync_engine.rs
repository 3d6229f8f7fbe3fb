//! Reconciliation of the local stats store with the remote store.
//!
//! A run reads both deck maps, merges them with the progress rule, uploads the decks where local
//! won, persists the merge, drains the pending-answer outbox and finally rebuilds the answered set
//! from the remote history. Every remote write is idempotent, so an aborted run is repaired by
//! running it again.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
    time::SystemTime,
};

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        local_store::LocalStatsStore,
        merge::merge_deck_stats,
        models::{AnswerQuery, UserId},
        remote_store::RemoteStatsStore,
        storage::StorageError,
    },
    services::sse_events,
    state::{
        SharedState,
        sync::{GuardRejection, StatsSnapshot},
    },
};

/// Reasons a reconciliation did not complete.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Nobody is signed in.
    #[error("no signed-in identity to reconcile")]
    Anonymous,
    /// No remote store is installed.
    #[error("remote store unavailable (degraded mode)")]
    Degraded,
    /// A run for the contained identity has not finished yet.
    #[error("reconciliation already running for `{0}`")]
    InFlight(UserId),
    /// The identity was reconciled earlier in this sign-in session.
    #[error("`{0}` was already reconciled in this session")]
    AlreadySynced(UserId),
    /// The identity changed while the run was in flight; its result was discarded.
    #[error("identity changed during reconciliation of `{0}`")]
    IdentityChanged(UserId),
    /// A remote read or write failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Counters describing a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Reconciled identity.
    pub user: UserId,
    /// Decks whose local totals were uploaded.
    pub decks_uploaded: usize,
    /// Outbox answers inserted remotely.
    pub answers_uploaded: usize,
    /// Decks whose remote totals replaced the local ones.
    pub decks_from_remote: usize,
    /// Size of the merged answered-card set.
    pub answered: usize,
}

/// Run every reconciliation step for `user` against `remote`.
///
/// Local records are only rewritten with merged data, and the outbox only loses answers once the
/// whole batch is confirmed, so an error at any step leaves local state valid.
pub async fn reconcile(
    local: &LocalStatsStore,
    remote: &dyn RemoteStatsStore,
    user: &UserId,
    recent_limit: usize,
) -> Result<(SyncReport, StatsSnapshot), SyncError> {
    let local_decks = local.deck_stats();
    let remote_decks = remote.fetch_deck_stats(user.clone()).await?;
    let outcome = merge_deck_stats(&local_decks, &remote_decks);
    debug!(
        user = %user,
        upload = outcome.upload.len(),
        from_remote = outcome.from_remote.len(),
        "merged deck stats"
    );

    try_join_all(
        outcome
            .upload
            .iter()
            .map(|(deck, stats)| remote.upsert_deck_stats(user.clone(), deck.clone(), *stats)),
    )
    .await?;

    let decks = local.merge_deck_stats(&outcome.merged);

    let pending = local.pending_answers();
    try_join_all(
        pending
            .iter()
            .map(|answer| remote.insert_card_answer(user.clone(), answer.clone())),
    )
    .await?;
    let uploaded: HashSet<Uuid> = pending.iter().map(|answer| answer.id).collect();
    local.remove_pending(&uploaded);

    let history = remote
        .fetch_card_answers(user.clone(), AnswerQuery::default())
        .await?;
    let answered: BTreeSet<String> =
        local.union_answered(history.iter().map(|answer| answer.card_id.clone()));
    let recent = history.into_iter().take(recent_limit).collect();

    let report = SyncReport {
        user: user.clone(),
        decks_uploaded: outcome.upload.len(),
        answers_uploaded: pending.len(),
        decks_from_remote: outcome.from_remote.len(),
        answered: answered.len(),
    };
    let snapshot = StatsSnapshot {
        user: user.clone(),
        decks,
        answered,
        recent,
    };
    Ok((report, snapshot))
}

/// Reconcile `user` under the sync guard, then publish the snapshot to the session and the SSE
/// stream.
///
/// With `allow_resync` a user already reconciled in this sign-in session is reconciled again.
pub async fn run_sync(
    state: &SharedState,
    user: UserId,
    allow_resync: bool,
) -> Result<SyncReport, SyncError> {
    {
        let mut guard = state.sync_guard().lock().await;
        guard.begin(&user, allow_resync).map_err(|rejection| match rejection {
            GuardRejection::InFlight(running) => SyncError::InFlight(running),
            GuardRejection::AlreadySynced => SyncError::AlreadySynced(user.clone()),
        })?;
    }

    let status = state.update_sync_status(|status| {
        status.syncing = true;
        status.last_error = None;
    });
    sse_events::broadcast_sync_status(state, &status);

    let result = reconcile_installed(state, &user).await;

    match result {
        Ok((report, snapshot)) => {
            {
                let mut session = state.session().lock().await;
                session.apply_snapshot(&snapshot);
                sse_events::broadcast_session_changed(state, &session);
            }
            state.sync_guard().lock().await.finish(&user, true);

            let status = state.update_sync_status(|status| {
                status.syncing = false;
                status.synced = true;
                status.last_synced_at = Some(SystemTime::now());
            });
            sse_events::broadcast_stats_snapshot(state, &snapshot);
            sse_events::broadcast_sync_status(state, &status);
            info!(
                user = %report.user,
                decks_uploaded = report.decks_uploaded,
                answers_uploaded = report.answers_uploaded,
                decks_from_remote = report.decks_from_remote,
                answered = report.answered,
                "reconciliation finished"
            );
            Ok(report)
        }
        Err(err) => {
            {
                // Earlier steps may already have merged remote totals into the local store.
                let mut session = state.session().lock().await;
                session.refresh_totals();
                sse_events::broadcast_session_changed(state, &session);
            }
            state.sync_guard().lock().await.finish(&user, false);
            let message = err.to_string();
            let status = state.update_sync_status(|status| {
                status.syncing = false;
                status.synced = false;
                status.last_error = Some(message);
            });
            sse_events::broadcast_sync_status(state, &status);
            warn!(user = %user, error = %err, "reconciliation aborted");
            Err(err)
        }
    }
}

/// Start [`run_sync`] in the background. Guard rejections are logged at debug level only.
pub fn spawn_sync(state: SharedState, user: UserId, allow_resync: bool) {
    tokio::spawn(async move {
        // Other failures are already logged and reflected in the sync status.
        if let Err(err @ (SyncError::InFlight(_) | SyncError::AlreadySynced(_))) =
            run_sync(&state, user, allow_resync).await
        {
            debug!(error = %err, "reconciliation not started");
        }
    });
}

async fn reconcile_installed(
    state: &SharedState,
    user: &UserId,
) -> Result<(SyncReport, StatsSnapshot), SyncError> {
    let remote: Arc<dyn RemoteStatsStore> =
        state.remote_store().await.ok_or(SyncError::Degraded)?;
    let outcome = reconcile(
        state.local(),
        remote.as_ref(),
        user,
        state.config().recent_answers_limit,
    )
    .await?;

    if state.identity().user() != Some(user) {
        return Err(SyncError::IdentityChanged(user.clone()));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::{io, time::Duration};

    use futures::future::BoxFuture;

    use super::*;
    use crate::dao::{
        local_store::{KeyValueBackend, LocalStoreResult, MemoryBackend},
        models::{ALL_DECK, AnswerChoice, CardAnswer, DeckStats, DeckStatsMap},
        remote_store::memory::MemoryRemoteStore,
        storage::StorageResult,
    };

    fn stats(played: u32, correct: u32) -> DeckStats {
        DeckStats {
            cards_played: played,
            total_correct: correct,
            total_wrong: played - correct,
        }
    }

    fn answer(card: &str, secs: u64) -> CardAnswer {
        CardAnswer {
            id: Uuid::new_v4(),
            card_id: card.into(),
            deck: ALL_DECK.into(),
            answer: AnswerChoice::Yes,
            correct: true,
            answered_at: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            response_time_ms: None,
        }
    }

    /// Lets a test keep a handle on the backend it hands to the store.
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

    /// Remote whose reads always fail.
    struct Unreachable;

    impl RemoteStatsStore for Unreachable {
        fn upsert_deck_stats(
            &self,
            _: UserId,
            _: String,
            _: DeckStats,
        ) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(down()) })
        }
        fn insert_card_answer(
            &self,
            _: UserId,
            _: CardAnswer,
        ) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(down()) })
        }
        fn fetch_deck_stats(&self, _: UserId) -> BoxFuture<'static, StorageResult<DeckStatsMap>> {
            Box::pin(async { Err(down()) })
        }
        fn fetch_card_answers(
            &self,
            _: UserId,
            _: AnswerQuery,
        ) -> BoxFuture<'static, StorageResult<Vec<CardAnswer>>> {
            Box::pin(async { Err(down()) })
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(down()) })
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(down()) })
        }
    }

    fn down() -> StorageError {
        StorageError::unavailable("offline".into(), io::Error::other("offline"))
    }

    #[tokio::test]
    async fn uploads_local_only_decks_and_drains_outbox() {
        let local = LocalStatsStore::in_memory();
        let remote = MemoryRemoteStore::new();
        let user = UserId::new("u1");

        local.record_answer(&answer("a", 1));
        local.record_answer(&answer("b", 2));

        let (report, snapshot) = reconcile(&local, &remote, &user, 10).await.unwrap();

        assert_eq!(report.decks_uploaded, 1);
        assert_eq!(report.answers_uploaded, 2);
        assert!(local.pending_answers().is_empty());
        assert_eq!(remote.answer_count(&user), 2);
        assert_eq!(
            remote.fetch_deck_stats(user.clone()).await.unwrap()[ALL_DECK],
            stats(2, 2)
        );
        assert_eq!(snapshot.recent[0].card_id, "b");
        assert_eq!(snapshot.answered.len(), 2);
    }

    #[tokio::test]
    async fn second_run_uploads_nothing() {
        let local = LocalStatsStore::in_memory();
        let remote = MemoryRemoteStore::new();
        let user = UserId::new("u1");
        let mut exercise = answer("a", 1);
        exercise.deck = "Exercise".into();
        local.record_answer(&exercise);

        let (_, first) = reconcile(&local, &remote, &user, 10).await.unwrap();
        let (report, second) = reconcile(&local, &remote, &user, 10).await.unwrap();

        assert_eq!(report.decks_uploaded, 0);
        assert_eq!(report.answers_uploaded, 0);
        assert_eq!(first, second);
        assert_eq!(remote.answer_count(&user), 1);
    }

    #[tokio::test]
    async fn remote_failure_leaves_local_state_untouched() {
        let local = LocalStatsStore::in_memory();
        let decks = local.record_answer(&answer("a", 1)).deck_stats;

        let err = reconcile(&local, &Unreachable, &UserId::new("u1"), 10)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Storage(_)));
        assert_eq!(local.pending_answers().len(), 1);
        assert_eq!(local.deck_stats(), decks);
    }

    #[tokio::test]
    async fn progress_held_only_in_memory_is_uploaded() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_reject_writes(true);
        let local = LocalStatsStore::new(SharedBackend(backend));
        let remote = MemoryRemoteStore::new();
        let user = UserId::new("u1");

        assert!(!local.record_answer(&answer("a", 1)).persisted);
        let (report, snapshot) = reconcile(&local, &remote, &user, 10).await.unwrap();

        assert_eq!(report.decks_uploaded, 1);
        assert_eq!(report.answers_uploaded, 1);
        assert_eq!(remote.answer_count(&user), 1);
        assert_eq!(snapshot.decks[ALL_DECK], stats(1, 1));
        assert!(local.pending_answers().is_empty());
    }
}
