//! Live play session: current card, phase, and per-deck totals.

use std::{collections::BTreeSet, sync::Arc, time::SystemTime};

use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        local_store::LocalStatsStore,
        merge::merge_deck_stats,
        models::{AnswerChoice, CardAnswer, DeckStats, DeckStatsMap, sort_most_recent_first},
    },
    services::deck_selector::select_deck,
    state::{
        catalog::{Card, Catalog, Deck},
        session_machine::{
            ApplyError, InvalidTransition, SessionEvent, SessionMachine, SessionPhase,
        },
        sync::StatsSnapshot,
    },
};

/// Failures of session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The event is not allowed in the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// A plan was applied against a newer session version.
    #[error(transparent)]
    Apply(#[from] ApplyError),
    /// The active deck has no cards to play.
    #[error("no active card in deck `{0}`")]
    NoActiveCard(String),
}

/// Result of a recorded answer.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    /// The recorded answer, also queued in the outbox.
    pub answer: CardAnswer,
    /// Totals of the active deck after the answer.
    pub stats: DeckStats,
    /// Whether the local store accepted every write.
    pub persisted: bool,
    /// Session version after the reveal.
    pub version: u64,
}

/// State of one play session against one deck context.
pub struct SessionTracker {
    catalog: Arc<Catalog>,
    local: Arc<LocalStatsStore>,
    machine: SessionMachine,
    deck: Deck,
    order: Vec<String>,
    position: usize,
    deck_stats: DeckStatsMap,
    answered: BTreeSet<String>,
    recent: Vec<CardAnswer>,
    recent_limit: usize,
    rng: StdRng,
}

impl SessionTracker {
    /// Start a session on the whole catalog, seeded from the local store.
    pub fn new(catalog: Arc<Catalog>, local: Arc<LocalStatsStore>, recent_limit: usize) -> Self {
        Self::with_rng(catalog, local, recent_limit, StdRng::from_os_rng())
    }

    /// Same as [`SessionTracker::new`] with an explicit random source.
    pub fn with_rng(
        catalog: Arc<Catalog>,
        local: Arc<LocalStatsStore>,
        recent_limit: usize,
        mut rng: StdRng,
    ) -> Self {
        let deck_stats = local.deck_stats();
        let answered = local.answered_card_ids();
        let mut recent = local.pending_answers();
        sort_most_recent_first(&mut recent);
        recent.truncate(recent_limit);

        let deck = Deck::All;
        let order = select_deck(&catalog, &deck, &answered, &mut rng);

        Self {
            catalog,
            local,
            machine: SessionMachine::new(),
            deck,
            order,
            position: 0,
            deck_stats,
            answered,
            recent,
            recent_limit,
            rng,
        }
    }

    /// Current phase of the play loop.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Version counter, bumped by every applied transition.
    pub fn version(&self) -> u64 {
        self.machine.version()
    }

    /// Active deck context.
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Card at the current position of the play order.
    pub fn current_card(&self) -> Option<&Card> {
        self.order
            .get(self.position)
            .and_then(|id| self.catalog.get(id))
    }

    /// Zero-based position in the play order and its length.
    pub fn progress(&self) -> (usize, usize) {
        (self.position, self.order.len())
    }

    /// Totals of the active deck, zero when it was never played.
    pub fn active_stats(&self) -> DeckStats {
        self.deck_stats
            .get(self.deck.label())
            .copied()
            .unwrap_or_default()
    }

    /// Totals of every deck played so far.
    pub fn deck_stats(&self) -> &DeckStatsMap {
        &self.deck_stats
    }

    /// Card identifiers already answered.
    pub fn answered(&self) -> &BTreeSet<String> {
        &self.answered
    }

    /// Recent answers, most recent first.
    pub fn recent(&self) -> &[CardAnswer] {
        &self.recent
    }

    /// Record the player's choice for the current card and reveal the outcome.
    ///
    /// Totals, the outbox and the answered set are written to the local store before returning,
    /// and the session adopts the stored totals afterwards.
    pub fn answer(
        &mut self,
        choice: AnswerChoice,
        response_time_ms: Option<u64>,
    ) -> Result<AnswerOutcome, SessionError> {
        let plan = self.machine.plan(SessionEvent::Answer)?;
        let card = self
            .current_card()
            .ok_or_else(|| SessionError::NoActiveCard(self.deck.label().to_string()))?;

        let correct = choice.as_bool() == card.success;
        let answer = CardAnswer {
            id: Uuid::new_v4(),
            card_id: card.id.clone(),
            deck: self.deck.label().to_string(),
            answer: choice,
            correct,
            answered_at: SystemTime::now(),
            response_time_ms,
        };

        let recorded = self.local.record_answer(&answer);
        let persisted = recorded.persisted;
        if !persisted {
            warn!(card_id = %answer.card_id, "answer kept in memory only");
        }
        self.deck_stats = recorded.deck_stats;
        self.answered = recorded.answered;
        self.recent.insert(0, answer.clone());
        self.recent.truncate(self.recent_limit);
        let stats = self
            .deck_stats
            .get(&answer.deck)
            .copied()
            .unwrap_or_default();

        self.machine.apply(plan)?;
        debug!(
            card_id = %answer.card_id,
            deck = %answer.deck,
            correct,
            cards_played = stats.cards_played,
            "answer recorded"
        );

        Ok(AnswerOutcome {
            answer,
            stats,
            persisted,
            version: self.machine.version(),
        })
    }

    /// Move to the next unanswered card of the play order, wrapping around.
    ///
    /// When every card of the order is answered the session keeps going sequentially and
    /// draws a fresh order after passing its end.
    pub fn next(&mut self) -> Result<SessionPhase, SessionError> {
        let plan = self.machine.plan(SessionEvent::Next)?;
        self.advance();
        Ok(self.machine.apply(plan)?)
    }

    /// Switch deck context, restarting on a freshly drawn order.
    pub fn change_deck(&mut self, label: Option<&str>) -> Result<SessionPhase, SessionError> {
        let deck = Deck::from_label(label);
        let plan = self
            .machine
            .plan(SessionEvent::ChangeDeck(deck.label().to_string()))?;

        self.order = select_deck(&self.catalog, &deck, &self.answered, &mut self.rng);
        self.position = 0;
        self.deck = deck;

        debug!(deck = %self.deck.label(), cards = self.order.len(), "deck changed");
        Ok(self.machine.apply(plan)?)
    }

    /// Fold a published sync snapshot into the session and the local store.
    pub fn apply_snapshot(&mut self, snapshot: &StatsSnapshot) {
        let merged = merge_deck_stats(&self.deck_stats, &snapshot.decks).merged;
        self.deck_stats = self.local.merge_deck_stats(&merged);

        let known = self.answered.iter().chain(&snapshot.answered).cloned();
        self.answered = self.local.union_answered(known.collect::<Vec<_>>());

        self.recent = snapshot.recent.clone();
        self.recent.truncate(self.recent_limit);
        self.machine.touch();

        debug!(
            user = %snapshot.user,
            decks = self.deck_stats.len(),
            answered = self.answered.len(),
            "applied sync snapshot"
        );
    }

    /// Fold the stored totals and answered set into the session without touching the play order.
    ///
    /// Picks up what an aborted reconciliation already merged into the local store.
    pub fn refresh_totals(&mut self) {
        self.deck_stats = merge_deck_stats(&self.deck_stats, &self.local.deck_stats()).merged;
        self.answered.extend(self.local.answered_card_ids());
        self.machine.touch();
    }

    /// Reload totals and the answered set from the local store and restart the active deck.
    pub fn reload(&mut self) -> Result<SessionPhase, SessionError> {
        let plan = self
            .machine
            .plan(SessionEvent::ChangeDeck(self.deck.label().to_string()))?;

        self.deck_stats = self.local.deck_stats();
        self.answered = self.local.answered_card_ids();
        let mut recent = self.local.pending_answers();
        sort_most_recent_first(&mut recent);
        recent.truncate(self.recent_limit);
        self.recent = recent;
        self.order = select_deck(&self.catalog, &self.deck, &self.answered, &mut self.rng);
        self.position = 0;

        Ok(self.machine.apply(plan)?)
    }

    fn advance(&mut self) {
        let len = self.order.len();
        if len == 0 {
            self.order = select_deck(&self.catalog, &self.deck, &self.answered, &mut self.rng);
            self.position = 0;
            return;
        }

        let next_unanswered = (1..len)
            .map(|step| (self.position + step) % len)
            .find(|&idx| !self.answered.contains(&self.order[idx]));

        match next_unanswered {
            Some(idx) => self.position = idx,
            None if self.position + 1 < len => self.position += 1,
            None => {
                self.order = select_deck(&self.catalog, &self.deck, &self.answered, &mut self.rng);
                self.position = 0;
            }
        }
    }
}
