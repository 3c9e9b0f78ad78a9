//! Badge unlock rules.

use std::collections::HashSet;

use crate::models::{BadgeKind, Flashcard, FlashcardStat, UserStats};

pub const STREAK_BADGE_THRESHOLD: u32 = 5;
pub const REVIEW_PRO_DECKS: u32 = 3;

/// What the evaluator needs to know about the deck being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeckSnapshot {
    /// The answer just processed was the deck's last card.
    pub completed: bool,
    /// Every answer recorded for this deck's cards during this pass was "Know".
    pub all_known: bool,
}

/// True when every log entry for a card in `deck` is a "Know".
pub fn deck_all_known(log: &[FlashcardStat], deck: &[Flashcard]) -> bool {
    let ids: HashSet<&str> = deck.iter().map(|c| c.id.as_str()).collect();
    log.iter()
        .filter(|s| ids.contains(s.flashcard_id.as_str()))
        .all(|s| s.is_known)
}

/// Badges that qualify now and are still locked, in evaluation order.
///
/// Pure: calling it again after [`apply`] returns nothing new.
pub fn evaluate(stats: &UserStats, deck: &DeckSnapshot) -> Vec<BadgeKind> {
    let mut unlocks = Vec::new();

    if stats.streak >= STREAK_BADGE_THRESHOLD {
        unlocks.push(BadgeKind::FiveCardsMaster);
    }
    if deck.completed && deck.all_known {
        unlocks.push(BadgeKind::PerfectDeck);
    }
    if deck.completed && stats.completed_decks >= REVIEW_PRO_DECKS {
        unlocks.push(BadgeKind::ReviewPro);
    }

    unlocks.retain(|kind| !stats.is_unlocked(*kind));
    unlocks
}

/// Flip the given badges on. Returns only the ones that actually changed.
pub fn apply(stats: &mut UserStats, unlocks: &[BadgeKind]) -> Vec<BadgeKind> {
    unlocks
        .iter()
        .copied()
        .filter(|kind| stats.unlock(*kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn card(id: &str) -> Flashcard {
        Flashcard {
            id: id.to_string(),
            question: "Q".into(),
            answer: "A".into(),
            category: "1".into(),
        }
    }

    #[test]
    fn test_streak_badge() {
        let mut stats = UserStats::default();
        stats.streak = 4;
        assert!(evaluate(&stats, &DeckSnapshot::default()).is_empty());

        stats.streak = 5;
        assert_eq!(evaluate(&stats, &DeckSnapshot::default()), vec![BadgeKind::FiveCardsMaster]);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let mut stats = UserStats::default();
        stats.streak = 12;
        stats.completed_decks = 3;
        let deck = DeckSnapshot { completed: true, all_known: true };

        let first = evaluate(&stats, &deck);
        assert_eq!(
            first,
            vec![BadgeKind::FiveCardsMaster, BadgeKind::PerfectDeck, BadgeKind::ReviewPro]
        );
        assert_eq!(apply(&mut stats, &first), first);

        assert!(evaluate(&stats, &deck).is_empty());
        assert!(apply(&mut stats, &first).is_empty());
    }

    #[test]
    fn test_deck_badges_need_completion() {
        let mut stats = UserStats::default();
        stats.completed_decks = 7;
        let deck = DeckSnapshot { completed: false, all_known: true };
        assert!(evaluate(&stats, &deck).is_empty());
    }

    #[test]
    fn test_review_pro_counts_decks() {
        let mut stats = UserStats::default();
        stats.completed_decks = 2;
        let deck = DeckSnapshot { completed: true, all_known: false };
        assert!(evaluate(&stats, &deck).is_empty());

        stats.completed_decks = 3;
        assert_eq!(evaluate(&stats, &deck), vec![BadgeKind::ReviewPro]);
    }

    #[test]
    fn test_deck_all_known_ignores_other_cards() {
        let when = Local.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        let deck = vec![card("a"), card("b")];
        let mut log = vec![
            FlashcardStat::new("zz", false, when, 0),
            FlashcardStat::new("a", true, when, 0),
            FlashcardStat::new("b", true, when, 0),
        ];
        assert!(deck_all_known(&log, &deck));

        log.push(FlashcardStat::new("b", false, when, 0));
        assert!(!deck_all_known(&log, &deck));
    }
}
