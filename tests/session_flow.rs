//! Play-session and sign-in flows driven through the service layer.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use rand::{SeedableRng, rngs::StdRng};
use tokio::time::{sleep, timeout};
use trialcards_sync::{
    config::AppConfig,
    dao::{
        local_store::LocalStatsStore,
        models::{ALL_DECK, AnswerChoice, UserId},
        remote_store::{RemoteStatsStore, memory::MemoryRemoteStore},
    },
    services::{auth_service, deck_selector::select_deck, session_service, stats_service},
    state::{
        AppState, SharedState,
        catalog::{Catalog, Deck},
        sync::Identity,
    },
};

const CATALOG: &str = r#"[
    {"id": "ex-1", "question": {"intervention": "Walking", "outcome": "HbA1c"}, "decks": ["Exercise"], "success": true},
    {"id": "ex-2", "question": {"intervention": "Tai chi", "outcome": "Falls"}, "decks": ["Exercise"], "success": false},
    {"id": "nu-1", "question": {"intervention": "Fibre", "outcome": "LDL"}, "decks": ["Nutrition"],
     "metadata": {"p_value": {"comparator": "<", "value": 0.03}}},
    {"id": "nu-2", "question": {"intervention": "Fasting", "outcome": "Weight"}, "decks": ["Nutrition"],
     "metadata": {"p_value": {"comparator": "=", "value": 0.4}}}
]"#;

fn state() -> SharedState {
    let catalog = Catalog::from_json(CATALOG).unwrap();
    AppState::new(AppConfig::default(), catalog, LocalStatsStore::in_memory())
}

async fn wait_until<F>(state: &SharedState, mut ready: F)
where
    F: FnMut(&SharedState) -> bool,
{
    timeout(Duration::from_secs(5), async {
        while !ready(state) {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn wait_for_sync(state: &SharedState) {
    let mut status = state.sync_status_watcher();
    timeout(Duration::from_secs(5), status.wait_for(|status| status.synced))
        .await
        .expect("sync did not finish in time")
        .expect("sync status channel closed");
}

#[test]
fn exercise_deck_falls_back_once_fully_answered() {
    let catalog = Catalog::from_json(CATALOG).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let exercise = Deck::from_label(Some("Exercise"));

    let mut order = select_deck(&catalog, &exercise, &BTreeSet::new(), &mut rng);
    order.sort();
    assert_eq!(order, vec!["ex-1".to_string(), "ex-2".to_string()]);

    let answered: BTreeSet<String> = order.iter().cloned().collect();
    let mut again = select_deck(&catalog, &exercise, &answered, &mut rng);
    again.sort();
    assert_eq!(again, order);
}

#[tokio::test]
async fn answering_a_deck_marks_cards_and_keeps_totals_consistent() {
    let state = state();
    let view = session_service::change_deck(&state, Some("Exercise")).await.unwrap();
    assert_eq!(view.deck, "Exercise");
    assert_eq!(view.deck_size, 2);

    for round in 0..2u32 {
        let response = session_service::submit_answer(&state, AnswerChoice::Yes, Some(900))
            .await
            .unwrap();
        assert!(response.persisted);
        assert_eq!(response.totals.cards_played, round + 1);
        assert!(response.totals.is_consistent());
        assert!(response.session.card.unwrap().reveal.is_some());
        session_service::next_card(&state).await.unwrap();
    }

    {
        let session = state.session().lock().await;
        assert!(session.answered().contains("ex-1"));
        assert!(session.answered().contains("ex-2"));
        assert_eq!(session.deck_stats()["Exercise"].cards_played, 2);
        assert!(!session.deck_stats().contains_key(ALL_DECK));
    }
    assert_eq!(state.local().pending_answers().len(), 2);

    let view = session_service::change_deck(&state, Some("Exercise")).await.unwrap();
    assert_eq!(view.deck_size, 2);
    assert!(view.card.is_some());
}

#[tokio::test]
async fn answering_twice_without_next_is_rejected() {
    let state = state();
    session_service::submit_answer(&state, AnswerChoice::No, None)
        .await
        .unwrap();
    assert!(
        session_service::submit_answer(&state, AnswerChoice::No, None)
            .await
            .is_err()
    );
    assert_eq!(state.local().pending_answers().len(), 1);
}

#[tokio::test]
async fn sign_in_reconciles_then_pushes_each_answer() {
    let state = state();
    let remote = MemoryRemoteStore::new();
    let user = UserId::new("player-42");

    session_service::submit_answer(&state, AnswerChoice::Yes, None)
        .await
        .unwrap();
    session_service::next_card(&state).await.unwrap();

    state
        .install_remote_store(Arc::new(remote.clone()) as Arc<dyn RemoteStatsStore>)
        .await;
    let response = auth_service::sign_in(&state, user.clone()).await;
    assert!(response.sync_started);

    wait_for_sync(&state).await;
    assert_eq!(remote.answer_count(&user), 1);
    assert!(state.local().pending_answers().is_empty());
    assert_eq!(
        remote.fetch_deck_stats(user.clone()).await.unwrap()[ALL_DECK].cards_played,
        1
    );

    let repeated = auth_service::sign_in(&state, user.clone()).await;
    assert!(!repeated.sync_started);

    session_service::submit_answer(&state, AnswerChoice::No, None)
        .await
        .unwrap();
    wait_until(&state, |state| state.local().pending_answers().is_empty()).await;
    assert_eq!(remote.answer_count(&user), 2);
    assert_eq!(
        remote.fetch_deck_stats(user.clone()).await.unwrap()[ALL_DECK].cards_played,
        2
    );

    let signed_out = auth_service::sign_out(&state).await;
    assert!(signed_out.user_id.is_none());
    assert!(!state.sync_status().synced);
    assert_eq!(state.local().answered_card_ids().len(), 2);
}

#[tokio::test]
async fn sign_in_while_degraded_waits_for_the_remote_store() {
    let state = state();
    let remote = MemoryRemoteStore::new();
    let user = UserId::new("player-7");

    session_service::submit_answer(&state, AnswerChoice::Yes, None)
        .await
        .unwrap();

    let response = auth_service::sign_in(&state, user.clone()).await;
    assert!(!response.sync_started);
    assert_eq!(state.local().pending_answers().len(), 1);

    state
        .install_remote_store(Arc::new(remote.clone()) as Arc<dyn RemoteStatsStore>)
        .await;
    assert!(auth_service::reevaluate(&state).await);

    wait_for_sync(&state).await;
    assert_eq!(remote.answer_count(&user), 1);
}

#[tokio::test]
async fn manual_resync_requires_a_signed_in_user() {
    let state = state();
    state
        .install_remote_store(Arc::new(MemoryRemoteStore::new()) as Arc<dyn RemoteStatsStore>)
        .await;

    assert!(auth_service::resync(&state).await.is_err());

    state.set_identity(Identity::Authenticated(UserId::new("player-9")));
    let report = auth_service::resync(&state).await.unwrap();
    assert_eq!(report.answers_uploaded, 0);
    assert!(state.sync_status().synced);
}

#[tokio::test]
async fn local_reset_restarts_from_zero() {
    let state = state();
    session_service::submit_answer(&state, AnswerChoice::Yes, None)
        .await
        .unwrap();

    let view = stats_service::reset_local(&state).await.unwrap();

    assert_eq!(view.stats.cards_played, 0);
    assert!(view.card.unwrap().reveal.is_none());
    assert!(state.local().pending_answers().is_empty());
    let overview = stats_service::stats_overview(&state).await;
    assert!(overview.decks.is_empty());
    assert_eq!(overview.overall.stats.cards_played, 0);
}
