//! Built-in card catalog and badge definitions.

use std::collections::HashSet;

use serde::Deserialize;

use crate::models::{Badge, BadgeKind, Category, Flashcard};

/// Bundled catalog: five categories, ten cards each.
const BUNDLED_CATALOG: &str = include_str!("../bundled/catalog.json");

#[derive(Debug, Deserialize)]
struct BundledCatalog {
    categories: Vec<Category>,
    cards: Vec<Flashcard>,
}

fn bundled() -> BundledCatalog {
    match serde_json::from_str::<BundledCatalog>(BUNDLED_CATALOG) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("bundled catalog is unreadable: {}", e);
            BundledCatalog {
                categories: Vec::new(),
                cards: Vec::new(),
            }
        }
    }
}

pub fn categories() -> Vec<Category> {
    bundled().categories
}

pub fn builtin_cards() -> Vec<Flashcard> {
    bundled().cards
}

/// Look up a category's display name.
pub fn category_name(categories: &[Category], id: &str) -> String {
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Built-in cards followed by custom ones. The first card seen with an id wins.
pub fn merge(builtin: Vec<Flashcard>, custom: Vec<Flashcard>) -> Vec<Flashcard> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(builtin.len() + custom.len());

    for card in builtin.into_iter().chain(custom) {
        if seen.insert(card.id.clone()) {
            merged.push(card);
        } else {
            tracing::warn!(card_id = %card.id, "dropping card with duplicate id");
        }
    }

    merged
}

fn badge_template(id: BadgeKind) -> Badge {
    let (name, description, icon, condition) = match id {
        BadgeKind::FiveCardsMaster => (
            "5 Cards Master",
            "Mark 5 'Know' cards in a row",
            "award",
            "5 consecutive correct answers",
        ),
        BadgeKind::PerfectDeck => (
            "Perfect Deck",
            "100% 'Know' in a deck",
            "star",
            "Complete a full deck with no errors",
        ),
        BadgeKind::ReviewPro => (
            "Review Pro",
            "Complete 3 decks",
            "trophy",
            "Complete 3 full decks",
        ),
        BadgeKind::SpeedLearner => (
            "Speed Learner",
            "Answer 10 cards in under 5 seconds each",
            "zap",
            "10 quick answers under 5 seconds each",
        ),
        BadgeKind::FocusMaster => (
            "Focus Master",
            "Study for 15 minutes straight",
            "brain",
            "15 minutes of continuous study",
        ),
    };

    Badge {
        id,
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        is_unlocked: false,
        unlock_condition: condition.to_string(),
    }
}

/// Every badge, locked.
///
/// Speed Learner and Focus Master have no trigger yet and stay locked.
pub fn badge_catalog() -> Vec<Badge> {
    BadgeKind::all().iter().map(|&kind| badge_template(kind)).collect()
}
