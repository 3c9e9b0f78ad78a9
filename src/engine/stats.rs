//! Point, streak and history bookkeeping, plus read-only projections used by
//! the stats screen.

use chrono::{Duration, NaiveDate};

use crate::models::{Category, DailyHistoryEntry, Flashcard, FlashcardStat, UserStats};

pub const KNOW_POINTS: u32 = 10;
pub const DONT_KNOW_POINTS: u32 = 5;
pub const COMPLETION_BONUS: u32 = 50;
/// Every this many consecutive "Know" answers earns a streak-saver token.
pub const TOKEN_INTERVAL: u32 = 5;

/// Apply a "Know". Returns true if a streak-saver token was minted.
///
/// Answers converted by the streak saver pass `mint_tokens = false` so that a
/// confirmation always nets exactly one spent token.
pub fn record_know(stats: &mut UserStats, date: NaiveDate, mint_tokens: bool) -> bool {
    stats.streak += 1;
    stats.points += KNOW_POINTS;
    stats.total_reviewed += 1;
    stats.known_count += 1;
    stats.history_entry_mut(date).known_count += 1;

    let earned = mint_tokens && stats.streak > 0 && stats.streak % TOKEN_INTERVAL == 0;
    if earned {
        stats.streak_saver_tokens += 1;
    }
    earned
}

/// Apply an un-saved "Don't Know".
pub fn record_dont_know(stats: &mut UserStats, date: NaiveDate) {
    stats.streak = 0;
    stats.points += DONT_KNOW_POINTS;
    stats.total_reviewed += 1;
    stats.not_known_count += 1;
    stats.history_entry_mut(date).not_known_count += 1;
}

pub fn award_completion_bonus(stats: &mut UserStats) -> u32 {
    stats.points += COMPLETION_BONUS;
    COMPLETION_BONUS
}

/// Answers left until the next token.
pub fn answers_until_token(stats: &UserStats) -> u32 {
    TOKEN_INTERVAL - stats.streak % TOKEN_INTERVAL
}

/// Share of known answers, as a rounded percentage.
pub fn success_rate(stats: &UserStats) -> u32 {
    if stats.total_reviewed == 0 {
        return 0;
    }
    ((stats.known_count as f64 / stats.total_reviewed as f64) * 100.0).round() as u32
}

/// Mean review time in whole seconds over the log.
pub fn average_review_time(log: &[FlashcardStat]) -> u32 {
    if log.is_empty() {
        return 0;
    }
    let total: u64 = log.iter().map(|s| s.review_time as u64).sum();
    (total as f64 / log.len() as f64).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBreakdown {
    pub category_id: String,
    pub name: String,
    pub known: u32,
    pub not_known: u32,
}

/// Known / not-known answer counts per category, in catalog order.
/// Log entries for cards no longer in the catalog are skipped.
pub fn category_breakdown(
    log: &[FlashcardStat],
    cards: &[Flashcard],
    categories: &[Category],
) -> Vec<CategoryBreakdown> {
    let mut rows: Vec<CategoryBreakdown> = categories
        .iter()
        .map(|c| CategoryBreakdown {
            category_id: c.id.clone(),
            name: c.name.clone(),
            known: 0,
            not_known: 0,
        })
        .collect();

    for stat in log {
        let Some(card) = cards.iter().find(|c| c.id == stat.flashcard_id) else {
            continue;
        };
        if let Some(row) = rows.iter_mut().find(|r| r.category_id == card.category) {
            if stat.is_known {
                row.known += 1;
            } else {
                row.not_known += 1;
            }
        }
    }

    rows
}

/// The last `days` days ending at `today`, oldest first, with zero rows for
/// days without answers.
pub fn recent_history(stats: &UserStats, today: NaiveDate, days: u32) -> Vec<DailyHistoryEntry> {
    (0..days as i64)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            stats
                .review_history
                .iter()
                .find(|e| e.date == date)
                .cloned()
                .unwrap_or_else(|| DailyHistoryEntry::empty(date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{builtin_cards, categories};
    use chrono::{Local, TimeZone};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_token_every_fifth_know() {
        let mut stats = UserStats::default();
        let minted: Vec<bool> = (0..10).map(|_| record_know(&mut stats, day(1), true)).collect();

        assert_eq!(minted.iter().filter(|m| **m).count(), 2);
        assert!(minted[4] && minted[9]);
        assert_eq!(stats.streak_saver_tokens, 2);
        assert_eq!(stats.points, 100);
    }

    #[test]
    fn test_dont_know_resets_streak() {
        let mut stats = UserStats::default();
        for _ in 0..3 {
            record_know(&mut stats, day(1), true);
        }
        record_dont_know(&mut stats, day(1));

        assert_eq!(stats.streak, 0);
        assert_eq!(stats.points, 35);
        assert_eq!(stats.total_reviewed, stats.known_count + stats.not_known_count);
        assert_eq!(stats.review_history[0].known_count, 3);
        assert_eq!(stats.review_history[0].not_known_count, 1);
    }

    #[test]
    fn test_history_one_row_per_day() {
        let mut stats = UserStats::default();
        record_know(&mut stats, day(1), true);
        record_dont_know(&mut stats, day(2));
        record_know(&mut stats, day(2), true);

        assert_eq!(stats.review_history.len(), 2);
        assert_eq!(stats.review_history[1].total(), 2);
    }

    #[test]
    fn test_projections() {
        let mut stats = UserStats::default();
        record_know(&mut stats, day(3), true);
        record_know(&mut stats, day(3), true);
        record_dont_know(&mut stats, day(3));
        assert_eq!(success_rate(&stats), 67);
        assert_eq!(success_rate(&UserStats::default()), 0);
        assert_eq!(answers_until_token(&stats), 5);

        let when = Local.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        let log = vec![
            FlashcardStat::new("m1", true, when, 4),
            FlashcardStat::new("s1", false, when, 9),
            FlashcardStat::new("s2", true, when, 0),
            FlashcardStat::new("zz", true, when, 3),
        ];
        assert_eq!(average_review_time(&log), 4);

        let rows = category_breakdown(&log, &builtin_cards(), &categories());
        assert_eq!(rows.len(), 5);
        assert_eq!((rows[0].known, rows[0].not_known), (1, 0));
        assert_eq!((rows[1].name.as_str(), rows[1].known, rows[1].not_known), ("Science", 1, 1));
    }

    #[test]
    fn test_recent_history_zero_fills() {
        let mut stats = UserStats::default();
        record_know(&mut stats, day(5), true);

        let week = recent_history(&stats, day(7), 7);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, day(1));
        assert_eq!(week[4].known_count, 1);
        assert_eq!(week[6].total(), 0);
    }
}
