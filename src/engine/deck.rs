//! Deck composition: category filter, queued cards first, the rest shuffled.

use std::collections::HashMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{Flashcard, ReviewQueue};

/// Which categories a deck draws from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// `"all"` (any case) selects everything; anything else is a category id.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Category(s.to_string())
        }
    }

    pub fn matches(&self, card: &Flashcard) -> bool {
        match self {
            Self::All => true,
            Self::Category(id) => card.category == *id,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Category(id) => write!(f, "{}", id),
        }
    }
}

/// Build an ordered deck from the catalog.
///
/// Cards whose ids are queued come first, in queue order. The remaining
/// filtered cards follow in a uniformly random order drawn from `rng`.
pub fn compose<R: Rng + ?Sized>(
    cards: &[Flashcard],
    filter: &CategoryFilter,
    queue: &ReviewQueue,
    rng: &mut R,
) -> Vec<Flashcard> {
    let filtered: Vec<&Flashcard> = cards.iter().filter(|c| filter.matches(c)).collect();
    let by_id: HashMap<&str, &Flashcard> = filtered.iter().map(|c| (c.id.as_str(), *c)).collect();

    let mut deck: Vec<Flashcard> = queue
        .iter()
        .filter_map(|id| by_id.get(id).map(|c| (*c).clone()))
        .collect();

    let mut rest: Vec<Flashcard> = filtered
        .into_iter()
        .filter(|c| !queue.contains(&c.id))
        .cloned()
        .collect();
    rest.shuffle(rng);

    tracing::debug!(
        filter = %filter,
        queued = deck.len(),
        shuffled = rest.len(),
        "composed deck"
    );

    deck.extend(rest);
    deck
}
