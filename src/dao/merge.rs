//! Progress-monotonic merge of deck statistics.
//!
//! `cards_played` only ever grows on either side, so the replica with strictly more recorded
//! answers for a deck holds the more complete history. Ties keep the local value.

use crate::dao::models::{DeckStats, DeckStatsMap};

/// Result of merging a local deck map with a remote one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Winning value for every deck present on either side.
    pub merged: DeckStatsMap,
    /// Decks where local is ahead of remote or remote has no row; these need uploading.
    pub upload: Vec<(String, DeckStats)>,
    /// Decks where the remote value won.
    pub from_remote: Vec<String>,
}

/// Pick the winner for a single deck: strictly greater `cards_played`, ties keep `local`.
pub fn prefer_progress(local: DeckStats, remote: DeckStats) -> DeckStats {
    if remote.cards_played > local.cards_played {
        remote
    } else {
        local
    }
}

/// Merge every deck present in either map.
///
/// Local decks keep their order; decks only known remotely are appended in remote order.
pub fn merge_deck_stats(local: &DeckStatsMap, remote: &DeckStatsMap) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (deck, &local_stats) in local {
        match remote.get(deck) {
            Some(&remote_stats) if remote_stats.cards_played > local_stats.cards_played => {
                outcome.merged.insert(deck.clone(), remote_stats);
                outcome.from_remote.push(deck.clone());
            }
            Some(&remote_stats) => {
                outcome.merged.insert(deck.clone(), local_stats);
                if local_stats.cards_played > remote_stats.cards_played {
                    outcome.upload.push((deck.clone(), local_stats));
                }
            }
            None => {
                outcome.merged.insert(deck.clone(), local_stats);
                outcome.upload.push((deck.clone(), local_stats));
            }
        }
    }

    for (deck, &remote_stats) in remote {
        if !local.contains_key(deck) {
            outcome.merged.insert(deck.clone(), remote_stats);
            outcome.from_remote.push(deck.clone());
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(played: u32, correct: u32) -> DeckStats {
        DeckStats {
            cards_played: played,
            total_correct: correct,
            total_wrong: played - correct,
        }
    }

    fn map(entries: &[(&str, DeckStats)]) -> DeckStatsMap {
        entries
            .iter()
            .map(|(deck, stats)| (deck.to_string(), *stats))
            .collect()
    }

    #[test]
    fn merging_with_itself_is_identity_and_uploads_nothing() {
        let a = map(&[("All", stats(4, 2)), ("Exercise", stats(3, 3))]);
        let outcome = merge_deck_stats(&a, &a);
        assert_eq!(outcome.merged, a);
        assert!(outcome.upload.is_empty());
        assert!(outcome.from_remote.is_empty());
    }

    #[test]
    fn remote_with_more_progress_wins() {
        let local = map(&[("All", stats(8, 5))]);
        let remote = map(&[("All", stats(15, 9))]);
        let outcome = merge_deck_stats(&local, &remote);
        assert_eq!(outcome.merged["All"], stats(15, 9));
        assert!(outcome.upload.is_empty());
        assert_eq!(outcome.from_remote, vec!["All".to_string()]);
    }

    #[test]
    fn local_ahead_or_missing_remotely_is_uploaded() {
        let local = map(&[("All", stats(10, 7)), ("Nutrition", stats(1, 0))]);
        let remote = map(&[("All", stats(6, 2)), ("Exercise", stats(2, 2))]);
        let outcome = merge_deck_stats(&local, &remote);

        assert_eq!(
            outcome.upload,
            vec![
                ("All".to_string(), stats(10, 7)),
                ("Nutrition".to_string(), stats(1, 0)),
            ]
        );
        assert_eq!(outcome.from_remote, vec!["Exercise".to_string()]);
        assert_eq!(outcome.merged.len(), 3);
    }

    #[test]
    fn ties_keep_local_without_upload() {
        let local = map(&[("All", stats(5, 4))]);
        let remote = map(&[("All", stats(5, 1))]);
        let outcome = merge_deck_stats(&local, &remote);
        assert_eq!(outcome.merged["All"], stats(5, 4));
        assert!(outcome.upload.is_empty());
    }

    #[test]
    fn merged_values_do_not_depend_on_argument_order() {
        let a = map(&[("All", stats(3, 1)), ("Exercise", stats(9, 4))]);
        let b = map(&[("All", stats(7, 7)), ("Nutrition", stats(2, 1))]);
        assert_eq!(
            merge_deck_stats(&a, &b).merged,
            merge_deck_stats(&b, &a).merged
        );
    }

    #[test]
    fn prefer_progress_is_strict() {
        assert_eq!(prefer_progress(stats(2, 1), stats(2, 2)), stats(2, 1));
        assert_eq!(prefer_progress(stats(2, 1), stats(3, 0)), stats(3, 0));
    }
}
