//! State transitions for "Know" and "Don't Know".
//!
//! These functions are the only place `UserStats`, the review queue and the
//! stat log change. They do not move the session cursor; the engine advances
//! after a recorded answer.

use chrono::{DateTime, Local};

use super::badges::{self, DeckSnapshot};
use super::session::ReviewSession;
use super::stats;
use super::streak_saver::PendingOverride;
use crate::models::{BadgeKind, FlashcardStat, ReviewQueue, UserStats};

/// A "Don't Know" is held for the streak saver at or above this streak.
pub const STREAK_SAVER_MIN_STREAK: u32 = 5;

/// Mutable learner state, loaded once and persisted after each answer.
#[derive(Debug, Clone, Default)]
pub struct ReviewState {
    pub stats: UserStats,
    pub queue: ReviewQueue,
    pub log: Vec<FlashcardStat>,
}

/// When the answer happened and how long the card was on screen.
#[derive(Debug, Clone, Copy)]
pub struct AnswerContext {
    pub now: DateTime<Local>,
    pub review_time: u32,
}

/// Things the front end may want to celebrate or show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    TokenEarned { tokens: u32 },
    BadgeUnlocked(BadgeKind),
    CompletionBonus { points: u32 },
    DeckCompleted { completed_decks: u32 },
    StreakSaverOffered { card_id: String, streak: u32 },
    StreakSaved { tokens_left: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowSource {
    Answered,
    StreakSaver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DontKnowOutcome {
    /// The session has no current card.
    Ignored,
    /// The streak saver must decide before anything is recorded.
    Deferred(PendingOverride),
    Recorded(Vec<SessionSignal>),
}

fn unlock_badges(stats: &mut UserStats, deck: &DeckSnapshot, signals: &mut Vec<SessionSignal>) {
    let unlocked = badges::apply(stats, &badges::evaluate(stats, deck));
    for kind in unlocked {
        tracing::info!(badge = ?kind, "badge unlocked");
        signals.push(SessionSignal::BadgeUnlocked(kind));
    }
}

/// Record the current card as known.
pub fn process_know(
    state: &mut ReviewState,
    session: &ReviewSession,
    ctx: &AnswerContext,
    source: KnowSource,
) -> Vec<SessionSignal> {
    let mut signals = Vec::new();
    let Some(card) = session.current() else {
        return signals;
    };
    let is_last = session.is_last();

    state
        .log
        .push(FlashcardStat::new(&card.id, true, ctx.now, ctx.review_time));

    let minted = stats::record_know(
        &mut state.stats,
        ctx.now.date_naive(),
        source == KnowSource::Answered,
    );
    if minted {
        signals.push(SessionSignal::TokenEarned {
            tokens: state.stats.streak_saver_tokens,
        });
    }

    if state.queue.remove(&card.id) {
        tracing::debug!(card_id = %card.id, "left review queue");
    }

    if is_last {
        state.stats.completed_decks += 1;
    }
    let deck = DeckSnapshot {
        completed: is_last,
        all_known: is_last
            && badges::deck_all_known(&state.log[session.log_start()..], session.deck()),
    };
    unlock_badges(&mut state.stats, &deck, &mut signals);

    if is_last {
        let points = stats::award_completion_bonus(&mut state.stats);
        signals.push(SessionSignal::CompletionBonus { points });
        signals.push(SessionSignal::DeckCompleted {
            completed_decks: state.stats.completed_decks,
        });
        tracing::info!(completed_decks = state.stats.completed_decks, "deck completed");
    }

    tracing::debug!(
        card_id = %card.id,
        streak = state.stats.streak,
        points = state.stats.points,
        "know"
    );
    signals
}

/// Entry point for "Don't Know": defers to the streak saver when the learner
/// has a streak worth saving and a token to spend.
pub fn process_dont_know(
    state: &mut ReviewState,
    session: &ReviewSession,
    ctx: &AnswerContext,
) -> DontKnowOutcome {
    let Some(card) = session.current() else {
        return DontKnowOutcome::Ignored;
    };

    if state.stats.streak >= STREAK_SAVER_MIN_STREAK && state.stats.streak_saver_tokens > 0 {
        tracing::debug!(card_id = %card.id, streak = state.stats.streak, "offering streak saver");
        return DontKnowOutcome::Deferred(PendingOverride::new(&card.id, ctx.review_time));
    }

    DontKnowOutcome::Recorded(record_miss(state, session, ctx))
}

/// The un-guarded "Don't Know": reset the streak and queue the card.
pub fn record_miss(
    state: &mut ReviewState,
    session: &ReviewSession,
    ctx: &AnswerContext,
) -> Vec<SessionSignal> {
    let mut signals = Vec::new();
    let Some(card) = session.current() else {
        return signals;
    };
    let is_last = session.is_last();

    state
        .log
        .push(FlashcardStat::new(&card.id, false, ctx.now, ctx.review_time));
    stats::record_dont_know(&mut state.stats, ctx.now.date_naive());

    if state.queue.enqueue(&card.id) {
        tracing::debug!(card_id = %card.id, queued = state.queue.len(), "queued for review");
    }

    if is_last {
        state.stats.completed_decks += 1;
        let deck = DeckSnapshot {
            completed: true,
            all_known: false,
        };
        unlock_badges(&mut state.stats, &deck, &mut signals);
        signals.push(SessionSignal::DeckCompleted {
            completed_decks: state.stats.completed_decks,
        });
        tracing::info!(completed_decks = state.stats.completed_decks, "deck completed");
    }

    tracing::debug!(card_id = %card.id, points = state.stats.points, "don't know");
    signals
}
