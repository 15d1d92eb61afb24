//! Category filtering and the derived reverse views.

use crate::models::{Card, CardId, Category};
use crate::scheduling::DuePolicy;
use crate::selection::Schedulable;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// A read-only presentation of a card. `card_id` always names the stored card,
/// so rating a view rates the original.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub card_id: CardId,
    pub sides: Vec<String>,
    pub category: Category,
    pub rate: Option<u32>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub due_at: Option<DateTime<Utc>>,
    pub reversed: bool,
}

impl CardView {
    pub fn of(card: &Card) -> Self {
        CardView {
            card_id: card.id.clone(),
            sides: card.sides.clone(),
            category: card.effective_category(),
            rate: card.rate,
            due_at: card.due_at,
            reversed: false,
        }
    }

    /// Swaps the two primary sides and relabels the view. Further sides keep their order.
    pub fn reversed(card: &Card, category: Category) -> Self {
        let mut sides = card.sides.clone();
        if sides.len() >= 2 {
            sides.swap(0, 1);
        }

        CardView {
            card_id: card.id.clone(),
            sides,
            category,
            rate: card.rate,
            due_at: card.due_at,
            reversed: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.card_id
    }

    pub fn front(&self) -> &str {
        self.sides.first().map(String::as_str).unwrap_or_default()
    }
}

impl Schedulable for CardView {
    fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }
}

/// Second filtering axis, applied after the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueFilter {
    #[default]
    All,
    /// Rated cards whose due instant has passed.
    DueOnly,
}

impl DueFilter {
    fn keeps(self, view: &CardView, now: DateTime<Utc>) -> bool {
        match self {
            DueFilter::All => true,
            DueFilter::DueOnly => view.due_at.is_some_and(|due| due <= now),
        }
    }
}

/// The cards shown when `category` is selected.
pub fn category_view(cards: &[Card], category: Category) -> Vec<CardView> {
    match category.mirrors() {
        Some(source) => cards
            .iter()
            .filter(|card| card.effective_category() == source)
            .map(|card| CardView::reversed(card, category))
            .collect(),
        None => cards
            .iter()
            .filter(|card| card.effective_category() == category)
            .map(CardView::of)
            .collect(),
    }
}

/// Categories that currently have something to show, in offering order.
pub fn available_categories(cards: &[Card]) -> Vec<Category> {
    Category::ALL
        .iter()
        .copied()
        .filter(|&category| {
            let source = category.mirrors().unwrap_or(category);
            cards.iter().any(|card| card.effective_category() == source)
        })
        .collect()
}

/// Keeps `requested` unless it would be empty while other cards exist.
pub fn resolve_category(cards: &[Card], requested: Category) -> Category {
    if cards.is_empty() || available_categories(cards).contains(&requested) {
        return requested;
    }

    let fallback = Category::FALLBACK_ORDER
        .iter()
        .copied()
        .find(|&category| cards.iter().any(|card| card.effective_category() == category));

    match fallback {
        Some(category) => {
            log::debug!("Category {} has no cards, falling back to {}", requested, category);
            category
        }
        None => requested,
    }
}

/// Resolves the category and builds the batch for it. Returns the category actually used.
pub fn build_batch(cards: &[Card], requested: Category, filter: DueFilter, now: DateTime<Utc>) -> (Category, Vec<CardView>) {
    let category = resolve_category(cards, requested);
    let batch = category_view(cards, category)
        .into_iter()
        .filter(|view| filter.keeps(view, now))
        .collect();
    (category, batch)
}

/// Shuffled reverse views of every `EN to NL` card that isn't waiting on a retry.
pub fn inverse_practice<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Vec<CardView> {
    let mut views: Vec<CardView> = cards
        .iter()
        .filter(|card| card.effective_category() == Category::EnToNl && card.rate != Some(0))
        .map(|card| CardView::reversed(card, Category::NlToEn))
        .collect();
    views.shuffle(rng);
    views
}

/// Number of due cards in a batch, for the header counter.
pub fn due_count(cards: &[Card], now: DateTime<Utc>) -> usize {
    cards.iter().filter(|card| DuePolicy::is_due(card, now)).count()
}
