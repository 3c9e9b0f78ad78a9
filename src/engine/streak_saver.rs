//! Streak saver: a held "Don't Know" that the learner can turn into a "Know"
//! by spending one token, or let through as a normal miss.

use super::answer::{self, AnswerContext, KnowSource, ReviewState, SessionSignal};
use super::session::ReviewSession;

/// A "Don't Know" waiting for the learner's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOverride {
    card_id: String,
    review_time: u32,
}

impl PendingOverride {
    pub fn new(card_id: &str, review_time: u32) -> Self {
        Self {
            card_id: card_id.to_string(),
            review_time,
        }
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    pub fn review_time(&self) -> u32 {
        self.review_time
    }

    /// Answer time is the one captured when the card was held.
    fn answer_context(&self, ctx: &AnswerContext) -> AnswerContext {
        AnswerContext {
            review_time: self.review_time,
            ..*ctx
        }
    }

    /// The held answer still refers to the card on screen.
    pub fn matches(&self, session: &ReviewSession) -> bool {
        session.current().map_or(false, |c| c.id == self.card_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterOutcome {
    /// Nothing changed: no token to spend, or the pending card is stale.
    Rejected,
    Resolved(Vec<SessionSignal>),
}

/// Spend a token and record the held card as known.
pub fn confirm(
    pending: &PendingOverride,
    state: &mut ReviewState,
    session: &ReviewSession,
    ctx: &AnswerContext,
) -> ArbiterOutcome {
    if state.stats.streak_saver_tokens == 0 || !pending.matches(session) {
        return ArbiterOutcome::Rejected;
    }

    state.stats.streak_saver_tokens -= 1;
    tracing::info!(
        card_id = %pending.card_id,
        tokens_left = state.stats.streak_saver_tokens,
        "streak saver used"
    );

    let ctx = pending.answer_context(ctx);
    let mut signals = vec![SessionSignal::StreakSaved {
        tokens_left: state.stats.streak_saver_tokens,
    }];
    signals.extend(answer::process_know(state, session, &ctx, KnowSource::StreakSaver));
    ArbiterOutcome::Resolved(signals)
}

/// Let the held "Don't Know" through: streak resets, card is queued.
pub fn cancel(
    pending: &PendingOverride,
    state: &mut ReviewState,
    session: &ReviewSession,
    ctx: &AnswerContext,
) -> ArbiterOutcome {
    if !pending.matches(session) {
        return ArbiterOutcome::Rejected;
    }
    let ctx = pending.answer_context(ctx);
    ArbiterOutcome::Resolved(answer::record_miss(state, session, &ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::answer::{process_dont_know, DontKnowOutcome};
    use crate::engine::deck::CategoryFilter;
    use crate::models::{BadgeKind, Flashcard};
    use chrono::{Local, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn deck() -> Vec<Flashcard> {
        ["x", "y", "z"]
            .iter()
            .map(|id| Flashcard {
                id: id.to_string(),
                question: "Q".into(),
                answer: "A".into(),
                category: "2".into(),
            })
            .collect()
    }

    fn ctx() -> AnswerContext {
        AnswerContext {
            now: Local.with_ymd_and_hms(2024, 2, 10, 18, 0, 0).unwrap(),
            review_time: 4,
        }
    }

    fn offered(streak: u32, tokens: u32) -> (ReviewState, ReviewSession, PendingOverride) {
        let mut state = ReviewState::default();
        state.stats.streak = streak;
        state.stats.streak_saver_tokens = tokens;

        let mut session = ReviewSession::new(CategoryFilter::All);
        session.recompose(&deck(), &state.queue, 0, &mut StdRng::seed_from_u64(8));

        match process_dont_know(&mut state, &session, &ctx()) {
            DontKnowOutcome::Deferred(pending) => (state, session, pending),
            other => panic!("expected deferral, got {:?}", other),
        }
    }

    #[test]
    fn test_confirm_spends_one_token_and_counts_as_known() {
        let (mut state, session, pending) = offered(5, 1);
        let card_id = pending.card_id().to_string();

        let outcome = confirm(&pending, &mut state, &session, &ctx());

        assert!(matches!(outcome, ArbiterOutcome::Resolved(_)));
        assert_eq!(state.stats.streak, 6);
        assert_eq!(state.stats.streak_saver_tokens, 0);
        assert_eq!(state.stats.points, 10);
        assert_eq!(state.stats.known_count, 1);
        assert!(!state.queue.contains(&card_id));
        assert!(state.stats.is_unlocked(BadgeKind::FiveCardsMaster));
    }

    #[test]
    fn test_confirm_reaching_token_multiple_does_not_mint() {
        let (mut state, session, pending) = offered(9, 1);

        confirm(&pending, &mut state, &session, &ctx());

        assert_eq!(state.stats.streak, 10);
        assert_eq!(state.stats.streak_saver_tokens, 0);
    }

    #[test]
    fn test_confirm_without_tokens_is_rejected() {
        let (mut state, session, pending) = offered(5, 1);
        state.stats.streak_saver_tokens = 0;
        let before = state.stats.clone();

        assert_eq!(confirm(&pending, &mut state, &session, &ctx()), ArbiterOutcome::Rejected);
        assert_eq!(state.stats, before);
    }

    #[test]
    fn test_cancel_records_the_miss() {
        let (mut state, session, pending) = offered(7, 2);

        let outcome = cancel(&pending, &mut state, &session, &ctx());

        assert!(matches!(outcome, ArbiterOutcome::Resolved(_)));
        assert_eq!(state.stats.streak, 0);
        assert_eq!(state.stats.streak_saver_tokens, 2);
        assert_eq!(state.stats.points, 5);
        assert!(state.queue.contains(pending.card_id()));
    }

    #[test]
    fn test_stale_pending_is_rejected() {
        let (mut state, session, _) = offered(5, 1);
        let stale = PendingOverride::new("not-on-screen", 0);

        assert_eq!(confirm(&stale, &mut state, &session, &ctx()), ArbiterOutcome::Rejected);
        assert_eq!(cancel(&stale, &mut state, &session, &ctx()), ArbiterOutcome::Rejected);
        assert_eq!(state.stats.streak_saver_tokens, 1);
    }
}
