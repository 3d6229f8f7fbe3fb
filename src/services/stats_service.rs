use tracing::info;

use crate::{
    dao::models::ALL_DECK,
    dto::{
        session::{AnswerView, SessionView},
        stats::{DeckSummary, DeckTotalsDto, DecksResponse, StatsResponse},
    },
    error::ServiceError,
    services::{
        deck_selector::deck_labels,
        session_service::session_view,
        sse_events,
        stats::{baseline_rate, current_streak, overall, trend},
    },
    state::{SharedState, catalog::Deck},
};

/// Deck picker entries: the whole catalog first, then each label in catalog order.
pub async fn deck_summaries(state: &SharedState) -> DecksResponse {
    let catalog = state.catalog();
    let played = {
        let session = state.session().lock().await;
        session.deck_stats().clone()
    };
    let summary = |label: &str, cards: usize| {
        let deck = Deck::from_label(Some(label));
        DeckSummary {
            label: deck.label().to_string(),
            cards,
            baseline_rate: baseline_rate(catalog, &deck),
            cards_played: played
                .get(deck.label())
                .map(|stats| stats.cards_played)
                .unwrap_or(0),
        }
    };

    let mut decks = vec![summary(ALL_DECK, catalog.len())];
    decks.extend(
        deck_labels(catalog)
            .iter()
            .map(|(label, cards)| summary(label, *cards)),
    );
    DecksResponse { decks }
}

/// Totals of every deck, overall totals, streak and trend.
pub async fn stats_overview(state: &SharedState) -> StatsResponse {
    let session = state.session().lock().await;
    let decks = session.deck_stats();
    let recent = session.recent();

    StatsResponse {
        decks: decks
            .iter()
            .map(|(label, stats)| (label.clone(), DeckTotalsDto::from(*stats)))
            .collect(),
        overall: overall(decks).into(),
        current_streak: current_streak(recent),
        trend: trend(recent),
        recent: recent.iter().map(AnswerView::from).collect(),
    }
}

/// Wipe the device-local records and restart the session from zero.
///
/// Remote rows are left alone; the next reconciliation takes them back as the more advanced side.
pub async fn reset_local(state: &SharedState) -> Result<SessionView, ServiceError> {
    state.local().clear();
    let mut session = state.session().lock().await;
    session.reload()?;
    sse_events::broadcast_session_changed(state, &session);
    info!("local stats cleared");
    Ok(session_view(state, &session))
}
