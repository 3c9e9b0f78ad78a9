//! Cursor over the composed deck.

use rand::Rng;

use super::deck::{compose, CategoryFilter};
use crate::models::{Flashcard, ReviewQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No cards match the filter; answers are ignored.
    Empty,
    Active,
}

/// Result of moving past the current card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor moved to the next card, or nothing happened in `Empty`.
    Next,
    /// The last card was answered and a fresh deck has been composed.
    Completed,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    filter: CategoryFilter,
    deck: Vec<Flashcard>,
    cursor: usize,
    /// Length of the stat log when this deck was composed.
    log_start: usize,
}

impl ReviewSession {
    pub fn new(filter: CategoryFilter) -> Self {
        Self {
            filter,
            deck: Vec::new(),
            cursor: 0,
            log_start: 0,
        }
    }

    /// Replace the deck with a fresh composition and rewind the cursor.
    pub fn recompose<R: Rng + ?Sized>(
        &mut self,
        cards: &[Flashcard],
        queue: &ReviewQueue,
        log_len: usize,
        rng: &mut R,
    ) {
        self.deck = compose(cards, &self.filter, queue, rng);
        self.cursor = 0;
        self.log_start = log_len;
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn phase(&self) -> SessionPhase {
        if self.deck.is_empty() {
            SessionPhase::Empty
        } else {
            SessionPhase::Active
        }
    }

    pub fn deck(&self) -> &[Flashcard] {
        &self.deck
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.deck.get(self.cursor)
    }

    pub fn is_last(&self) -> bool {
        !self.deck.is_empty() && self.cursor == self.deck.len() - 1
    }

    pub fn log_start(&self) -> usize {
        self.log_start
    }

    /// Step to the next card. At the end of the deck a new deck is composed
    /// from `queue`, so the session never stalls.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        cards: &[Flashcard],
        queue: &ReviewQueue,
        log_len: usize,
        rng: &mut R,
    ) -> Advance {
        if self.deck.is_empty() {
            return Advance::Next;
        }

        if self.cursor < self.deck.len() - 1 {
            self.cursor += 1;
            return Advance::Next;
        }

        self.recompose(cards, queue, log_len, rng);
        Advance::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_cards;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_session_ignores_advance() {
        let cards = builtin_cards();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = ReviewSession::new(CategoryFilter::parse("nope"));
        session.recompose(&cards, &ReviewQueue::new(), 0, &mut rng);

        assert_eq!(session.phase(), SessionPhase::Empty);
        assert!(session.current().is_none());
        assert!(!session.is_last());
        assert_eq!(session.advance(&cards, &ReviewQueue::new(), 0, &mut rng), Advance::Next);
    }

    #[test]
    fn test_cycles_through_deck_then_recomposes() {
        let cards = builtin_cards();
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = ReviewSession::new(CategoryFilter::parse("3"));
        session.recompose(&cards, &ReviewQueue::new(), 0, &mut rng);

        for i in 0..9 {
            assert_eq!(session.cursor(), i);
            assert_eq!(session.advance(&cards, &ReviewQueue::new(), 0, &mut rng), Advance::Next);
        }
        assert!(session.is_last());

        let queue = ReviewQueue::from(vec!["h7".to_string()]);
        assert_eq!(session.advance(&cards, &queue, 12, &mut rng), Advance::Completed);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.log_start(), 12);
        assert_eq!(session.deck().len(), 10);
        assert_eq!(session.current().map(|c| c.id.as_str()), Some("h7"));
    }
}
