//! Data models for flashcards, review history and gamification state.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two answers a learner can give for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Know,
    DontKnow,
}

impl Answer {
    pub fn from_key(c: char) -> Option<Self> {
        match c {
            '1' | 'y' => Some(Self::Know),
            '2' | 'n' => Some(Self::DontKnow),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Know => "Know",
            Self::DontKnow => "Don't Know",
        }
    }

    pub fn color_for_theme(&self, theme: &crate::ui::theme::Theme) -> ratatui::style::Color {
        match self {
            Self::Know => theme.colors.know,
            Self::DontKnow => theme.colors.dont_know,
        }
    }
}

/// A single flashcard. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub category: String,
}

impl Flashcard {
    /// Build a user-authored card with a fresh `custom-` id.
    pub fn custom(question: String, answer: String, category: String) -> Self {
        Self {
            id: format!("custom-{}", &Uuid::new_v4().simple().to_string()[..8]),
            question,
            answer,
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// One answer event. The stat log only ever grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardStat {
    pub id: String,
    pub flashcard_id: String,
    pub is_known: bool,
    pub review_date: DateTime<Local>,
    /// Seconds spent on the card; zero when the timer is disabled.
    pub review_time: u32,
}

impl FlashcardStat {
    pub fn new(flashcard_id: &str, is_known: bool, review_date: DateTime<Local>, review_time: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            flashcard_id: flashcard_id.to_string(),
            is_known,
            review_date,
            review_time,
        }
    }
}

/// Identity of every badge in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeKind {
    FiveCardsMaster,
    PerfectDeck,
    ReviewPro,
    SpeedLearner,
    FocusMaster,
}

impl BadgeKind {
    pub fn all() -> &'static [BadgeKind] {
        &[
            BadgeKind::FiveCardsMaster,
            BadgeKind::PerfectDeck,
            BadgeKind::ReviewPro,
            BadgeKind::SpeedLearner,
            BadgeKind::FocusMaster,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: BadgeKind,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Only ever flips from false to true.
    pub is_unlocked: bool,
    pub unlock_condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyHistoryEntry {
    pub date: NaiveDate,
    pub known_count: u32,
    pub not_known_count: u32,
}

impl DailyHistoryEntry {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            known_count: 0,
            not_known_count: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.known_count + self.not_known_count
    }
}

/// Aggregate gamification state for the learner.
///
/// `total_reviewed` always equals `known_count + not_known_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub points: u32,
    pub streak: u32,
    pub total_reviewed: u32,
    pub known_count: u32,
    pub not_known_count: u32,
    pub streak_saver_tokens: u32,
    pub badges: Vec<Badge>,
    pub review_history: Vec<DailyHistoryEntry>,
    #[serde(default)]
    pub completed_decks: u32,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            points: 0,
            streak: 0,
            total_reviewed: 0,
            known_count: 0,
            not_known_count: 0,
            streak_saver_tokens: 0,
            badges: crate::catalog::badge_catalog(),
            review_history: Vec::new(),
            completed_decks: 0,
        }
    }
}

impl UserStats {
    pub fn badge(&self, kind: BadgeKind) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == kind)
    }

    pub fn is_unlocked(&self, kind: BadgeKind) -> bool {
        self.badge(kind).map_or(false, |b| b.is_unlocked)
    }

    /// Mark a badge unlocked. Returns true only on the false -> true transition.
    pub fn unlock(&mut self, kind: BadgeKind) -> bool {
        match self.badges.iter_mut().find(|b| b.id == kind) {
            Some(badge) if !badge.is_unlocked => {
                badge.is_unlocked = true;
                true
            }
            _ => false,
        }
    }

    /// Today's history row, created on first use.
    pub fn history_entry_mut(&mut self, date: NaiveDate) -> &mut DailyHistoryEntry {
        let pos = match self.review_history.iter().position(|e| e.date == date) {
            Some(pos) => pos,
            None => {
                self.review_history.push(DailyHistoryEntry::empty(date));
                self.review_history.len() - 1
            }
        };
        &mut self.review_history[pos]
    }

    /// Fill in any catalog badges missing from an older snapshot.
    pub fn ensure_badges(&mut self) {
        for template in crate::catalog::badge_catalog() {
            if self.badge(template.id).is_none() {
                self.badges.push(template);
            }
        }
    }
}

/// Ids of missed cards awaiting prioritized re-review, in first-missed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ReviewQueue {
    ids: Vec<String>,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|q| q == id)
    }

    /// Append to the tail unless already queued. Returns true if added.
    pub fn enqueue(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Returns true if the id was queued.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|q| q != id);
        self.ids.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<String>> for ReviewQueue {
    fn from(ids: Vec<String>) -> Self {
        let mut queue = Self::new();
        for id in &ids {
            queue.enqueue(id);
        }
        queue
    }
}

impl From<ReviewQueue> for Vec<String> {
    fn from(queue: ReviewQueue) -> Self {
        queue.ids
    }
}

/// Learner-facing settings, persisted through the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_true")]
    pub sound_effects: bool,
    #[serde(default = "default_true")]
    pub timer_enabled: bool,
    #[serde(default = "default_timer_duration")]
    pub timer_duration_secs: u32,
}

fn default_true() -> bool {
    true
}

fn default_timer_duration() -> u32 {
    20
}

impl AppSettings {
    /// Countdown length per card. A stored zero falls back to the default.
    pub fn timer_duration(&self) -> Duration {
        let secs = match self.timer_duration_secs {
            0 => default_timer_duration(),
            secs => secs,
        };
        Duration::from_secs(u64::from(secs))
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            sound_effects: true,
            timer_enabled: true,
            timer_duration_secs: default_timer_duration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_rejects_duplicates() {
        let mut queue = ReviewQueue::new();
        assert!(queue.enqueue("m1"));
        assert!(queue.enqueue("s2"));
        assert!(!queue.enqueue("m1"));

        assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["m1", "s2"]);
    }

    #[test]
    fn test_queue_dedupes_on_load() {
        let queue: ReviewQueue = serde_json::from_str(r#"["h1","g2","h1","g3"]"#).unwrap();
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["h1", "g2", "g3"]);

        let json = serde_json::to_string(&queue).unwrap();
        assert_eq!(json, r#"["h1","g2","g3"]"#);
    }

    #[test]
    fn test_queue_remove() {
        let mut queue = ReviewQueue::from(vec!["a".to_string(), "b".to_string()]);
        assert!(queue.remove("a"));
        assert!(!queue.remove("a"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_unlock_is_one_way() {
        let mut stats = UserStats::default();
        assert!(stats.unlock(BadgeKind::PerfectDeck));
        assert!(!stats.unlock(BadgeKind::PerfectDeck));
        assert!(stats.is_unlocked(BadgeKind::PerfectDeck));
    }

    #[test]
    fn test_history_entry_created_lazily() {
        let mut stats = UserStats::default();
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        stats.history_entry_mut(day).known_count += 1;
        stats.history_entry_mut(day).not_known_count += 1;

        assert_eq!(stats.review_history.len(), 1);
        assert_eq!(stats.review_history[0].total(), 2);
    }

    #[test]
    fn test_old_snapshot_without_completed_decks() {
        let json = r#"{
            "points": 40, "streak": 2, "totalReviewed": 4, "knownCount": 3,
            "notKnownCount": 1, "streakSaverTokens": 0, "badges": [], "reviewHistory": []
        }"#;
        let mut stats: UserStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.completed_decks, 0);

        stats.ensure_badges();
        assert_eq!(stats.badges.len(), BadgeKind::all().len());
    }

    #[test]
    fn test_custom_card_id_prefix() {
        let card = Flashcard::custom("Q".into(), "A".into(), "2".into());
        assert!(card.id.starts_with("custom-"));
        assert_eq!(card.id.len(), "custom-".len() + 8);
    }

    #[test]
    fn test_zero_timer_duration_falls_back() {
        let settings: AppSettings = serde_json::from_str(r#"{"timerDurationSecs":0}"#).unwrap();
        assert_eq!(settings.timer_duration(), Duration::from_secs(20));

        let settings = AppSettings {
            timer_duration_secs: 30,
            ..AppSettings::default()
        };
        assert_eq!(settings.timer_duration(), Duration::from_secs(30));
    }
}
