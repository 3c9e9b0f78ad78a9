//! Review session engine.
//!
//! `ReviewEngine` holds the single mutable session state: learner stats, the
//! review queue, the stat log and the deck cursor. Every operation runs to
//! completion and writes the state back to the store before returning.

pub mod answer;
pub mod badges;
pub mod deck;
pub mod session;
pub mod stats;
pub mod streak_saver;
pub mod timer;

use std::time::Instant;

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog;
use crate::models::{AppSettings, Category, Flashcard, FlashcardStat, ReviewQueue, UserStats};
use crate::storage::{KeyValueStore, SessionStore};

pub use answer::{AnswerContext, DontKnowOutcome, ReviewState, SessionSignal};
pub use deck::CategoryFilter;
pub use session::{Advance, ReviewSession, SessionPhase};
pub use streak_saver::{ArbiterOutcome, PendingOverride};
pub use timer::CardTimer;

/// A point in time, both monotonic (for the countdown) and wall clock (for
/// the stat log and daily history).
#[derive(Debug, Clone, Copy)]
pub struct Moment {
    pub instant: Instant,
    pub wall: DateTime<Local>,
}

impl Moment {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Local::now(),
        }
    }
}

pub struct ReviewEngine<S, R = StdRng> {
    store: SessionStore<S>,
    rng: R,
    categories: Vec<Category>,
    cards: Vec<Flashcard>,
    settings: AppSettings,
    state: ReviewState,
    session: ReviewSession,
    pending: Option<PendingOverride>,
    timer: CardTimer,
}

impl<S: KeyValueStore> ReviewEngine<S, StdRng> {
    pub fn open(store: SessionStore<S>, filter: CategoryFilter) -> Self {
        Self::with_rng(store, filter, StdRng::from_entropy())
    }
}

impl<S: KeyValueStore, R: Rng> ReviewEngine<S, R> {
    /// Load everything from the store and compose the first deck.
    pub fn with_rng(store: SessionStore<S>, filter: CategoryFilter, mut rng: R) -> Self {
        let cards = catalog::merge(catalog::builtin_cards(), store.load_custom_cards());
        let state = ReviewState {
            stats: store.load_user_stats(),
            queue: store.load_queue(),
            log: store.load_stat_log(),
        };
        let settings = store.load_settings();

        let mut session = ReviewSession::new(filter);
        session.recompose(&cards, &state.queue, state.log.len(), &mut rng);

        tracing::info!(
            cards = cards.len(),
            deck = session.deck().len(),
            queued = state.queue.len(),
            "review engine ready"
        );

        Self {
            store,
            rng,
            categories: catalog::categories(),
            cards,
            settings,
            state,
            session,
            pending: None,
            timer: CardTimer::new(),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Answering
    // ══════════════════════════════════════════════════════════════════════

    /// Can the learner answer right now?
    fn accepting_answers(&self) -> bool {
        self.pending.is_none() && self.session.phase() == SessionPhase::Active
    }

    fn review_time(&self, at: Moment) -> u32 {
        if !self.settings.timer_enabled {
            return 0;
        }
        self.session
            .current()
            .map_or(0, |card| self.timer.elapsed_secs(&card.id, at.instant))
    }

    pub fn know(&mut self, at: Moment) -> Vec<SessionSignal> {
        if !self.accepting_answers() {
            return Vec::new();
        }
        let ctx = AnswerContext {
            now: at.wall,
            review_time: self.review_time(at),
        };
        self.timer.cancel();

        let signals = answer::process_know(
            &mut self.state,
            &self.session,
            &ctx,
            answer::KnowSource::Answered,
        );
        self.finish_answer(at);
        signals
    }

    pub fn dont_know(&mut self, at: Moment) -> Vec<SessionSignal> {
        if !self.accepting_answers() {
            return Vec::new();
        }
        let ctx = AnswerContext {
            now: at.wall,
            review_time: self.review_time(at),
        };
        self.timer.cancel();
        self.resolve_dont_know(&ctx, at)
    }

    fn resolve_dont_know(&mut self, ctx: &AnswerContext, at: Moment) -> Vec<SessionSignal> {
        match answer::process_dont_know(&mut self.state, &self.session, ctx) {
            DontKnowOutcome::Ignored => Vec::new(),
            DontKnowOutcome::Deferred(pending) => {
                let signal = SessionSignal::StreakSaverOffered {
                    card_id: pending.card_id().to_string(),
                    streak: self.state.stats.streak,
                };
                self.pending = Some(pending);
                vec![signal]
            }
            DontKnowOutcome::Recorded(signals) => {
                self.finish_answer(at);
                signals
            }
        }
    }

    /// Spend a token to keep the streak. No-op without a held answer or token.
    pub fn confirm_streak_saver(&mut self, at: Moment) -> Vec<SessionSignal> {
        let Some(pending) = self.pending.as_ref() else {
            return Vec::new();
        };
        let ctx = AnswerContext {
            now: at.wall,
            review_time: pending.review_time(),
        };

        match streak_saver::confirm(pending, &mut self.state, &self.session, &ctx) {
            ArbiterOutcome::Rejected => {
                tracing::debug!("streak saver confirmation rejected");
                Vec::new()
            }
            ArbiterOutcome::Resolved(signals) => {
                self.pending = None;
                self.finish_answer(at);
                signals
            }
        }
    }

    /// Decline the streak saver: the held "Don't Know" is recorded as-is.
    pub fn cancel_streak_saver(&mut self, at: Moment) -> Vec<SessionSignal> {
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };
        let ctx = AnswerContext {
            now: at.wall,
            review_time: pending.review_time(),
        };

        match streak_saver::cancel(&pending, &mut self.state, &self.session, &ctx) {
            ArbiterOutcome::Rejected => {
                self.present(at);
                Vec::new()
            }
            ArbiterOutcome::Resolved(signals) => {
                self.finish_answer(at);
                signals
            }
        }
    }

    /// Drive the countdown. An expiry on the current card is a "Don't Know".
    pub fn tick(&mut self, at: Moment) -> Vec<SessionSignal> {
        let Some(expiry) = self.timer.poll(at.instant) else {
            self.present(at);
            return Vec::new();
        };

        let on_screen = self.session.current().map(|c| c.id.as_str());
        if !self.accepting_answers() || on_screen != Some(expiry.card_id.as_str()) {
            tracing::debug!(card_id = %expiry.card_id, "ignoring stale timeout");
            return Vec::new();
        }

        tracing::debug!(card_id = %expiry.card_id, "time is up");
        let ctx = AnswerContext {
            now: at.wall,
            review_time: expiry.elapsed_secs,
        };
        self.resolve_dont_know(&ctx, at)
    }

    fn finish_answer(&mut self, at: Moment) {
        let advance = self.session.advance(
            &self.cards,
            &self.state.queue,
            self.state.log.len(),
            &mut self.rng,
        );
        if advance == Advance::Completed {
            tracing::debug!(deck = self.session.deck().len(), "recomposed after completion");
        }
        self.persist();
        self.present(at);
    }

    /// Stop the countdown while the card is off screen. The next `tick`
    /// starts it again from the full duration.
    pub fn pause(&mut self) {
        self.timer.cancel();
    }

    /// Arm the countdown for the card on screen if it is not already running.
    fn present(&mut self, at: Moment) {
        if !self.settings.timer_enabled || !self.accepting_answers() {
            return;
        }
        let Some(card) = self.session.current() else {
            return;
        };
        if self.timer.armed_for() != Some(card.id.as_str()) {
            self.timer.arm(&card.id, self.settings.timer_duration(), at.instant);
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save_user_stats(&self.state.stats) {
            tracing::warn!(error = %e, "failed to save user stats");
        }
        if let Err(e) = self.store.save_queue(&self.state.queue) {
            tracing::warn!(error = %e, "failed to save review queue");
        }
        if let Err(e) = self.store.save_stat_log(&self.state.log) {
            tracing::warn!(error = %e, "failed to save stat log");
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Deck and settings changes
    // ══════════════════════════════════════════════════════════════════════

    /// Switch category and compose a new deck. A held answer is recorded
    /// as a miss first.
    pub fn set_filter(&mut self, filter: CategoryFilter, at: Moment) {
        self.settle_pending(at);
        self.timer.cancel();
        self.session.set_filter(filter);
        self.recompose(at);
    }

    /// The deck is about to change under a held "Don't Know": let it through.
    fn settle_pending(&mut self, at: Moment) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let ctx = AnswerContext {
            now: at.wall,
            review_time: pending.review_time(),
        };
        if let ArbiterOutcome::Resolved(_) =
            streak_saver::cancel(&pending, &mut self.state, &self.session, &ctx)
        {
            tracing::debug!(card_id = %pending.card_id(), "held answer recorded before deck change");
            self.persist();
        }
    }

    fn recompose(&mut self, at: Moment) {
        self.session.recompose(
            &self.cards,
            &self.state.queue,
            self.state.log.len(),
            &mut self.rng,
        );
        self.present(at);
    }

    /// Store a new custom card and rebuild the deck so it can show up.
    pub fn add_custom_card(&mut self, card: Flashcard, at: Moment) {
        if let Err(e) = self.store.append_custom_card(&card) {
            tracing::warn!(error = %e, "failed to save custom card");
        }
        tracing::info!(card_id = %card.id, category = %card.category, "custom card added");

        self.settle_pending(at);
        self.cards = catalog::merge(std::mem::take(&mut self.cards), vec![card]);
        self.timer.cancel();
        self.recompose(at);
    }

    pub fn update_settings(&mut self, settings: AppSettings, at: Moment) {
        if let Err(e) = self.store.save_settings(&settings) {
            tracing::warn!(error = %e, "failed to save settings");
        }
        let duration_changed = settings.timer_duration_secs != self.settings.timer_duration_secs;
        self.settings = settings;

        if !self.settings.timer_enabled || duration_changed {
            self.timer.cancel();
        }
        self.present(at);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Read access
    // ══════════════════════════════════════════════════════════════════════

    pub fn stats(&self) -> &UserStats {
        &self.state.stats
    }

    pub fn queue(&self) -> &ReviewQueue {
        &self.state.queue
    }

    pub fn log(&self) -> &[FlashcardStat] {
        &self.state.log
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.session.current()
    }

    pub fn pending(&self) -> Option<&PendingOverride> {
        self.pending.as_ref()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn timer(&self) -> &CardTimer {
        &self.timer
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BadgeKind;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::time::Duration;

    fn start_moment() -> Moment {
        Moment {
            instant: Instant::now(),
            wall: Local.with_ymd_and_hms(2024, 9, 14, 12, 0, 0).unwrap(),
        }
    }

    fn after(at: Moment, secs: u64) -> Moment {
        Moment {
            instant: at.instant + Duration::from_secs(secs),
            wall: at.wall + chrono::Duration::seconds(secs as i64),
        }
    }

    fn engine_with(
        filter: &str,
        seed: impl FnOnce(&mut SessionStore<MemoryStore>),
        timer: bool,
    ) -> ReviewEngine<MemoryStore> {
        let mut store = SessionStore::new(MemoryStore::new());
        store
            .save_settings(&AppSettings {
                timer_enabled: timer,
                ..AppSettings::default()
            })
            .unwrap();
        seed(&mut store);
        ReviewEngine::with_rng(store, CategoryFilter::parse(filter), StdRng::seed_from_u64(2024))
    }

    fn engine(filter: &str) -> ReviewEngine<MemoryStore> {
        engine_with(filter, |_| {}, false)
    }

    fn assert_totals(engine: &ReviewEngine<MemoryStore>) {
        let s = engine.stats();
        assert_eq!(s.total_reviewed, s.known_count + s.not_known_count);
    }

    #[test]
    fn test_science_deck_has_ten_cards() {
        let engine = engine("2");
        assert_eq!(engine.session().deck().len(), 10);
        assert_eq!(engine.session().phase(), SessionPhase::Active);
    }

    #[test]
    fn test_run_of_knows_builds_streak() {
        let mut engine = engine("all");
        let at = start_moment();

        for n in 1..=7 {
            engine.know(at);
            assert_eq!(engine.stats().streak, n);
            assert_totals(&engine);
        }
        assert_eq!(engine.stats().streak_saver_tokens, 1);

        let signals = engine.dont_know(at);
        assert!(matches!(signals[0], SessionSignal::StreakSaverOffered { .. }));
        engine.cancel_streak_saver(at);
        assert_eq!(engine.stats().streak, 0);
        assert_totals(&engine);
    }

    #[test]
    fn test_unsaved_miss_resets_streak() {
        let mut engine = engine("all");
        let at = start_moment();

        engine.know(at);
        engine.know(at);
        let missed = engine.current_card().unwrap().id.clone();
        let signals = engine.dont_know(at);

        assert!(signals.is_empty());
        assert_eq!(engine.stats().streak, 0);
        assert!(engine.queue().contains(&missed));
        assert_eq!(engine.session().cursor(), 3);
    }

    #[test]
    fn test_streak_saver_confirm_keeps_streak() {
        let mut engine = engine_with(
            "all",
            |store| {
                let mut stats = UserStats::default();
                stats.streak = 5;
                stats.streak_saver_tokens = 1;
                store.save_user_stats(&stats).unwrap();
            },
            false,
        );
        let at = start_moment();
        let held = engine.current_card().unwrap().id.clone();

        let offered = engine.dont_know(at);
        assert_eq!(
            offered,
            vec![SessionSignal::StreakSaverOffered { card_id: held.clone(), streak: 5 }]
        );
        assert_eq!(engine.pending().map(|p| p.card_id()), Some(held.as_str()));

        // Answers wait until the decision is made.
        assert!(engine.know(at).is_empty());
        assert_eq!(engine.stats().total_reviewed, 0);

        let signals = engine.confirm_streak_saver(at);
        assert_eq!(signals[0], SessionSignal::StreakSaved { tokens_left: 0 });
        assert!(signals.contains(&SessionSignal::BadgeUnlocked(BadgeKind::FiveCardsMaster)));
        assert_eq!(engine.stats().streak, 6);
        assert_eq!(engine.stats().streak_saver_tokens, 0);
        assert!(!engine.queue().contains(&held));
        assert!(engine.pending().is_none());
        assert_eq!(engine.session().cursor(), 1);
    }

    #[test]
    fn test_last_card_know_awards_bonus_and_recomposes() {
        let mut engine = engine("4");
        let at = start_moment();

        for _ in 0..9 {
            engine.know(at);
        }
        assert!(engine.session().is_last());
        let before = engine.stats().points;

        let signals = engine.know(at);

        assert_eq!(engine.stats().points - before, 60);
        assert!(signals.contains(&SessionSignal::CompletionBonus { points: 50 }));
        assert!(signals.contains(&SessionSignal::DeckCompleted { completed_decks: 1 }));
        assert!(signals.contains(&SessionSignal::BadgeUnlocked(BadgeKind::PerfectDeck)));
        assert_eq!(engine.session().cursor(), 0);
        assert_eq!(engine.session().deck().len(), 10);
    }

    #[test]
    fn test_missed_cards_lead_next_deck() {
        let mut engine = engine("5");
        let at = start_moment();
        let mut missed = Vec::new();

        for i in 0..10 {
            if i % 3 == 0 {
                missed.push(engine.current_card().unwrap().id.clone());
                engine.dont_know(at);
            } else {
                engine.know(at);
            }
        }

        let lead: Vec<String> = engine.session().deck()[..missed.len()]
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(lead, missed);
        assert_eq!(engine.stats().completed_decks, 1);
    }

    #[test]
    fn test_review_pro_after_three_decks() {
        let mut engine = engine("1");
        let at = start_moment();
        let mut unlocked_at = None;

        for deck in 1..=3 {
            for _ in 0..10 {
                let signals = engine.know(at);
                if signals.contains(&SessionSignal::BadgeUnlocked(BadgeKind::ReviewPro)) {
                    unlocked_at = Some(deck);
                }
            }
        }

        assert_eq!(unlocked_at, Some(3));
        assert_eq!(engine.stats().completed_decks, 3);
    }

    #[test]
    fn test_empty_category_ignores_answers() {
        let mut engine = engine("does-not-exist");
        let at = start_moment();

        assert_eq!(engine.session().phase(), SessionPhase::Empty);
        assert!(engine.know(at).is_empty());
        assert!(engine.dont_know(at).is_empty());
        assert!(engine.tick(after(at, 60)).is_empty());
        assert_eq!(engine.stats().total_reviewed, 0);
    }

    #[test]
    fn test_state_is_persisted_after_each_answer() {
        let mut engine = engine("3");
        let at = start_moment();

        engine.know(at);
        engine.dont_know(at);

        let store = engine.store();
        assert_eq!(store.load_user_stats().points, 15);
        assert_eq!(store.load_queue().len(), 1);
        assert_eq!(store.load_stat_log().len(), 2);
    }

    #[test]
    fn test_timeout_forces_dont_know() {
        let mut engine = engine_with("2", |_| {}, true);
        let at = start_moment();
        engine.tick(at);
        let first = engine.current_card().unwrap().id.clone();
        assert_eq!(engine.timer().armed_for(), Some(first.as_str()));

        assert!(engine.tick(after(at, 19)).is_empty());
        engine.tick(after(at, 20));

        assert!(engine.queue().contains(&first));
        assert_eq!(engine.stats().not_known_count, 1);
        assert_eq!(engine.log()[0].review_time, 20);
        assert_eq!(engine.session().cursor(), 1);
    }

    #[test]
    fn test_manual_answer_cancels_timeout() {
        let mut engine = engine_with("2", |_| {}, true);
        let at = start_moment();
        engine.tick(at);

        engine.know(after(at, 6));
        assert_eq!(engine.log()[0].review_time, 6);

        // The next card's countdown started when it appeared.
        assert!(engine.tick(after(at, 21)).is_empty());
        assert_eq!(engine.stats().not_known_count, 0);
        assert_eq!(engine.stats().known_count, 1);
    }

    #[test]
    fn test_timeout_routes_through_streak_saver() {
        let mut engine = engine_with(
            "2",
            |store| {
                let mut stats = UserStats::default();
                stats.streak = 8;
                stats.streak_saver_tokens = 2;
                store.save_user_stats(&stats).unwrap();
            },
            true,
        );
        let at = start_moment();
        engine.tick(at);

        let signals = engine.tick(after(at, 20));

        assert!(matches!(signals[0], SessionSignal::StreakSaverOffered { .. }));
        assert!(engine.timer().armed_for().is_none());
        assert!(engine.tick(after(at, 100)).is_empty());
        assert!(engine.pending().is_some());
    }

    #[test]
    fn test_pause_restarts_countdown() {
        let mut engine = engine_with("2", |_| {}, true);
        let at = start_moment();
        engine.tick(at);

        engine.pause();
        assert!(engine.timer().armed_for().is_none());

        // Back on screen after a minute: a fresh countdown, not an instant miss.
        assert!(engine.tick(after(at, 60)).is_empty());
        assert!(engine.tick(after(at, 79)).is_empty());
        assert_eq!(engine.stats().total_reviewed, 0);
        engine.tick(after(at, 80));
        assert_eq!(engine.stats().not_known_count, 1);
    }

    #[test]
    fn test_disabled_timer_records_zero_time() {
        let mut engine = engine("2");
        let at = start_moment();
        engine.tick(at);
        engine.know(after(at, 9));

        assert!(engine.timer().armed_for().is_none());
        assert_eq!(engine.log()[0].review_time, 0);
    }

    #[test]
    fn test_filter_change_recomposes() {
        let mut engine = engine("all");
        let at = start_moment();
        assert_eq!(engine.session().deck().len(), 50);

        engine.set_filter(CategoryFilter::parse("3"), at);
        assert_eq!(engine.session().deck().len(), 10);
        assert_eq!(engine.session().cursor(), 0);
    }

    #[test]
    fn test_custom_card_joins_deck() {
        let mut engine = engine("2");
        let at = start_moment();
        let card = Flashcard::custom("Boiling point of water?".into(), "100 °C".into(), "2".into());
        let id = card.id.clone();

        engine.add_custom_card(card, at);

        assert_eq!(engine.session().deck().len(), 11);
        assert!(engine.cards().iter().any(|c| c.id == id));
        assert_eq!(engine.store().load_custom_cards().len(), 1);
    }

    fn engine_holding_offer(filter: &str) -> (ReviewEngine<MemoryStore>, String) {
        let mut engine = engine_with(
            filter,
            |store| {
                let mut stats = UserStats::default();
                stats.streak = 6;
                stats.streak_saver_tokens = 1;
                store.save_user_stats(&stats).unwrap();
            },
            false,
        );
        let held = engine.current_card().unwrap().id.clone();
        engine.dont_know(start_moment());
        assert!(engine.pending().is_some());
        (engine, held)
    }

    #[test]
    fn test_filter_change_records_held_answer() {
        let (mut engine, held) = engine_holding_offer("all");

        engine.set_filter(CategoryFilter::parse("3"), start_moment());

        assert!(engine.pending().is_none());
        assert_eq!(engine.stats().streak, 0);
        assert_eq!(engine.stats().streak_saver_tokens, 1);
        assert_eq!(engine.stats().not_known_count, 1);
        assert_totals(&engine);
        assert!(engine.queue().contains(&held));
        assert!(engine.store().load_queue().contains(&held));
        assert_eq!(engine.store().load_stat_log().len(), 1);
        assert_eq!(engine.session().deck().len(), 10);
    }

    #[test]
    fn test_custom_card_records_held_answer() {
        let (mut engine, held) = engine_holding_offer("2");
        let card = Flashcard::custom("Speed of light?".into(), "299 792 km/s".into(), "2".into());

        engine.add_custom_card(card, start_moment());

        assert!(engine.pending().is_none());
        assert_eq!(engine.stats().streak, 0);
        assert_eq!(engine.stats().total_reviewed, 1);
        assert_eq!(engine.session().deck()[0].id, held);
        assert_eq!(engine.session().deck().len(), 11);
    }

    #[test]
    fn test_zero_timer_duration_uses_default() {
        let mut engine = engine_with(
            "2",
            |store| {
                store
                    .save_settings(&AppSettings {
                        timer_duration_secs: 0,
                        ..AppSettings::default()
                    })
                    .unwrap();
            },
            true,
        );
        let at = start_moment();

        for _ in 0..11 {
            assert!(engine.tick(at).is_empty());
        }

        assert_eq!(engine.stats().total_reviewed, 0);
        assert!(engine.queue().is_empty());
        assert_eq!(engine.timer().remaining(at.instant), Some(Duration::from_secs(20)));
        assert!(engine.tick(after(at, 19)).is_empty());
        assert_eq!(engine.stats().total_reviewed, 0);
    }

    #[test]
    fn test_corrupt_store_starts_fresh() {
        let mut raw = MemoryStore::new();
        raw.insert_raw(crate::storage::USER_STATS_KEY, "{oops");
        raw.insert_raw(crate::storage::REVIEW_QUEUE_KEY, "[\"m1\",");
        let engine = ReviewEngine::with_rng(
            SessionStore::new(raw),
            CategoryFilter::All,
            StdRng::seed_from_u64(1),
        );

        assert_eq!(engine.stats(), &UserStats::default());
        assert!(engine.queue().is_empty());
        assert_eq!(engine.session().deck().len(), 50);
    }
}
