//! Read-side statistics derived from deck totals, recent answers and the catalog.

use crate::{
    dao::models::{CardAnswer, DeckStats, DeckStatsMap},
    state::catalog::{Catalog, Deck},
};

/// Size of each window compared by [`trend`].
pub const TREND_WINDOW: usize = 10;

/// Presentation bundle for one deck context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsView {
    /// Raw totals.
    pub stats: DeckStats,
    /// Percentage of correct answers, 0 to 100.
    pub accuracy: u32,
    /// Consecutive correct answers, most recent first.
    pub current_streak: u32,
    /// Percentage points gained over the previous window.
    pub trend: i32,
    /// Percentage of cards in the deck whose intervention succeeded.
    pub baseline_rate: u32,
}

/// Rounded percentage of correct answers; 0 when nothing was played.
pub fn accuracy(stats: &DeckStats) -> u32 {
    percentage(stats.total_correct as usize, stats.cards_played as usize)
}

/// Consecutive correct answers counted from the most recent one.
pub fn current_streak(recent: &[CardAnswer]) -> u32 {
    recent.iter().take_while(|answer| answer.correct).count() as u32
}

/// Accuracy of the latest [`TREND_WINDOW`] answers minus accuracy of the window before it.
pub fn trend(recent: &[CardAnswer]) -> i32 {
    let latest = recent.iter().take(TREND_WINDOW);
    let previous = recent.iter().skip(TREND_WINDOW).take(TREND_WINDOW);
    window_accuracy(latest) as i32 - window_accuracy(previous) as i32
}

/// Share of successful cards in `deck`, independent of any play history.
pub fn baseline_rate(catalog: &Catalog, deck: &Deck) -> u32 {
    let (successes, total) = catalog
        .in_deck(deck)
        .fold((0, 0), |(successes, total), card| {
            (successes + usize::from(card.success), total + 1)
        });
    percentage(successes, total)
}

/// Totals summed over every deck context.
pub fn overall(decks: &DeckStatsMap) -> DeckStats {
    decks
        .values()
        .fold(DeckStats::default(), |acc, stats| acc.combined(*stats))
}

/// Compute every view for `deck`, using `recent` for streak and trend.
pub fn stats_view(
    catalog: &Catalog,
    deck: &Deck,
    stats: DeckStats,
    recent: &[CardAnswer],
) -> StatsView {
    StatsView {
        stats,
        accuracy: accuracy(&stats),
        current_streak: current_streak(recent),
        trend: trend(recent),
        baseline_rate: baseline_rate(catalog, deck),
    }
}

fn window_accuracy<'a>(window: impl Iterator<Item = &'a CardAnswer>) -> u32 {
    let (correct, total) = window.fold((0, 0), |(correct, total), answer| {
        (correct + usize::from(answer.correct), total + 1)
    });
    percentage(correct, total)
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;
    use crate::{
        dao::models::{ALL_DECK, AnswerChoice},
        state::catalog::{Card, CardMetadata, Question},
    };

    fn answers(pattern: &[bool]) -> Vec<CardAnswer> {
        pattern
            .iter()
            .enumerate()
            .map(|(idx, &correct)| CardAnswer {
                id: Uuid::new_v4(),
                card_id: format!("card-{idx}"),
                deck: ALL_DECK.into(),
                answer: AnswerChoice::Yes,
                correct,
                answered_at: SystemTime::UNIX_EPOCH,
                response_time_ms: None,
            })
            .collect()
    }

    #[test]
    fn accuracy_is_zero_without_plays() {
        assert_eq!(accuracy(&DeckStats::default()), 0);
    }

    #[test]
    fn accuracy_rounds_to_nearest_percent() {
        let stats = DeckStats {
            cards_played: 3,
            total_correct: 2,
            total_wrong: 1,
        };
        assert_eq!(accuracy(&stats), 67);
    }

    #[test]
    fn streak_counts_from_most_recent() {
        assert_eq!(current_streak(&answers(&[true, true, true, false, true])), 3);
        assert_eq!(current_streak(&answers(&[false, true])), 0);
        assert_eq!(current_streak(&[]), 0);
    }

    #[test]
    fn trend_compares_consecutive_windows() {
        let mut pattern = vec![true; 10];
        pattern.extend([true, false, true, false, true, false, true, false, true, false]);
        assert_eq!(trend(&answers(&pattern)), 50);

        // Missing previous window counts as zero accuracy.
        assert_eq!(trend(&answers(&[true, true])), 100);
        assert_eq!(trend(&[]), 0);
    }

    #[test]
    fn baseline_rate_follows_deck_filter() {
        let card = |id: &str, success: bool, decks: &[&str]| Card {
            id: id.into(),
            question: Question {
                intervention: id.into(),
                outcome: "o".into(),
                population: None,
            },
            success,
            decks: decks.iter().map(|d| d.to_string()).collect(),
            metadata: CardMetadata::default(),
        };
        let catalog = Catalog::from_cards(vec![
            card("a", true, &["Exercise"]),
            card("b", false, &["Exercise"]),
            card("c", true, &["Exercise"]),
            card("d", true, &["Nutrition"]),
        ])
        .unwrap();

        assert_eq!(baseline_rate(&catalog, &Deck::Named("Exercise".into())), 67);
        assert_eq!(baseline_rate(&catalog, &Deck::All), 75);
        assert_eq!(baseline_rate(&catalog, &Deck::Named("None".into())), 0);
    }

    #[test]
    fn overall_sums_every_deck() {
        let mut decks = DeckStatsMap::new();
        decks.insert(
            ALL_DECK.into(),
            DeckStats {
                cards_played: 4,
                total_correct: 3,
                total_wrong: 1,
            },
        );
        decks.insert(
            "Exercise".into(),
            DeckStats {
                cards_played: 2,
                total_correct: 0,
                total_wrong: 2,
            },
        );
        let total = overall(&decks);
        assert_eq!(total.cards_played, 6);
        assert!(total.is_consistent());
    }
}
