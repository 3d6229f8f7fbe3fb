//! Session operations exposed to the UI, plus the best-effort remote push after each answer.

use std::collections::HashSet;

use futures::try_join;
use tracing::{debug, warn};

use crate::{
    dao::models::{AnswerChoice, CardAnswer, DeckStats, UserId},
    dto::{
        session::{AnswerResponse, AnswerView, CardView, SessionView},
        sync::SyncStatusDto,
    },
    error::ServiceError,
    services::{sse_events, stats::stats_view},
    state::{SharedState, session::SessionTracker, session_machine::SessionPhase},
};

/// Current session view.
pub async fn current_session(state: &SharedState) -> SessionView {
    let session = state.session().lock().await;
    session_view(state, &session)
}

/// Record an answer for the current card.
///
/// The answer is durable locally when this returns. When the signed-in user was already
/// reconciled, the deck row and the answer are also pushed to the remote store in the
/// background; the outbox keeps the answer until that push or a later sync confirms it.
pub async fn submit_answer(
    state: &SharedState,
    choice: AnswerChoice,
    response_time_ms: Option<u64>,
) -> Result<AnswerResponse, ServiceError> {
    let (outcome, view) = {
        let mut session = state.session().lock().await;
        let outcome = session.answer(choice, response_time_ms)?;
        sse_events::broadcast_session_changed(state, &session);
        (outcome, session_view(state, &session))
    };

    if let Some(user) = state.identity().user().cloned() {
        if state.sync_guard().lock().await.is_synced_for(&user) {
            tokio::spawn(push_answer(
                state.clone(),
                user,
                outcome.answer.clone(),
                outcome.stats,
            ));
        } else {
            debug!(user = %user, "not reconciled yet; answer stays in the outbox");
        }
    }

    Ok(AnswerResponse {
        answer: AnswerView::from(&outcome.answer),
        totals: outcome.stats,
        persisted: outcome.persisted,
        session: view,
    })
}

/// Move on to the next card after a reveal.
pub async fn next_card(state: &SharedState) -> Result<SessionView, ServiceError> {
    let mut session = state.session().lock().await;
    session.next()?;
    sse_events::broadcast_session_changed(state, &session);
    Ok(session_view(state, &session))
}

/// Switch the deck context. `None` selects the whole catalog.
pub async fn change_deck(
    state: &SharedState,
    deck: Option<&str>,
) -> Result<SessionView, ServiceError> {
    let mut session = state.session().lock().await;
    session.change_deck(deck)?;
    sse_events::broadcast_session_changed(state, &session);
    Ok(session_view(state, &session))
}

/// Build the UI view of `session`.
pub fn session_view(state: &SharedState, session: &SessionTracker) -> SessionView {
    let (position, deck_size) = session.progress();
    let revealed = session.phase() == SessionPhase::Reveal;
    let view = stats_view(
        state.catalog(),
        session.deck(),
        session.active_stats(),
        session.recent(),
    );

    SessionView {
        phase: session.phase().into(),
        version: session.version(),
        deck: session.deck().label().to_string(),
        position,
        deck_size,
        card: session
            .current_card()
            .map(|card| CardView::new(card, revealed)),
        stats: view.into(),
        user_id: state.identity().user().map(ToString::to_string),
        sync: SyncStatusDto::from(state.sync_status()),
    }
}

/// Push one answer and its deck row; on success acknowledge the answer in the outbox.
async fn push_answer(state: SharedState, user: UserId, answer: CardAnswer, stats: DeckStats) {
    let Some(remote) = state.remote_store().await else {
        debug!(answer_id = %answer.id, "remote store unavailable; answer stays in the outbox");
        return;
    };

    let pushed = try_join!(
        remote.upsert_deck_stats(user.clone(), answer.deck.clone(), stats),
        remote.insert_card_answer(user.clone(), answer.clone()),
    );

    match pushed {
        Ok(_) => {
            state.local().remove_pending(&HashSet::from([answer.id]));
            debug!(user = %user, answer_id = %answer.id, "answer pushed to remote store");
        }
        Err(err) => {
            warn!(
                user = %user,
                answer_id = %answer.id,
                transient = err.is_transient(),
                error = %err,
                "remote push failed; answer stays in the outbox"
            );
        }
    }
}
