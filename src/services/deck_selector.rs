//! Play-order derivation from the catalog and the answered-card set.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rand::{Rng, seq::SliceRandom};

use crate::state::catalog::{Catalog, Deck};

/// Shuffled play order for `deck`, skipping answered cards unless that leaves nothing to play.
///
/// A fully answered deck falls back to all of its cards so it stays playable.
pub fn select_deck<R>(
    catalog: &Catalog,
    deck: &Deck,
    answered: &BTreeSet<String>,
    rng: &mut R,
) -> Vec<String>
where
    R: Rng + ?Sized,
{
    let in_deck: Vec<String> = catalog.in_deck(deck).map(|card| card.id.clone()).collect();
    let unanswered: Vec<String> = in_deck
        .iter()
        .filter(|id| !answered.contains(*id))
        .cloned()
        .collect();

    let mut order = if unanswered.is_empty() {
        in_deck
    } else {
        unanswered
    };
    order.shuffle(rng);
    order
}

/// Distinct deck labels with their card counts, in first-seen catalog order.
pub fn deck_labels(catalog: &Catalog) -> IndexMap<String, usize> {
    let mut labels = IndexMap::new();
    for card in catalog.cards() {
        for deck in &card.decks {
            *labels.entry(deck.clone()).or_insert(0) += 1;
        }
    }
    labels
}
