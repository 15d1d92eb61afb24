use crate::models::{Card, Category, CategoryStats, ReviewStats};
use chrono::{DateTime, Duration, Utc};

/// Delay before a card rated 0 comes back.
pub const RETRY_DELAY_MINUTES: i64 = 10;

/// Upper bound for day-count ratings typed by the user.
pub const MAX_DAY_RATING: u32 = 999;

/// Rating used when typed input can't be understood.
pub const DEFAULT_DAY_RATING: u32 = 1;

/// User-chosen interval scheduling: a rating is the number of days until the card is due again.
pub struct DuePolicy;

impl DuePolicy {
    /// Due instant for a rating given at `now`. Rating 0 means "show again soon".
    /// Day counts above [`MAX_DAY_RATING`] are capped.
    pub fn due_at(rating: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = match rating {
            0 => Duration::minutes(RETRY_DELAY_MINUTES),
            days => Duration::days(i64::from(days.min(MAX_DAY_RATING))),
        };
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Rated and past its due instant.
    pub fn is_due(card: &Card, now: DateTime<Utc>) -> bool {
        card.due_at.is_some_and(|due| due <= now)
    }

    pub fn due_cards(cards: &[Card], now: DateTime<Utc>) -> Vec<Card> {
        cards.iter().filter(|card| Self::is_due(card, now)).cloned().collect()
    }

    pub fn calculate_stats(cards: &[Card], now: DateTime<Utc>) -> ReviewStats {
        let cards_due = cards.iter().filter(|card| Self::is_due(card, now)).count();
        let cards_new = cards.iter().filter(|card| card.due_at.is_none()).count();

        ReviewStats {
            total_cards: cards.len(),
            cards_due,
            cards_new,
            cards_upcoming: cards.len() - cards_due - cards_new,
        }
    }

    /// Per stored category, in offering order. Categories without cards are left out.
    pub fn category_stats(cards: &[Card], now: DateTime<Utc>) -> Vec<CategoryStats> {
        Category::ALL
            .iter()
            .filter_map(|&category| {
                let in_category: Vec<Card> = cards
                    .iter()
                    .filter(|card| card.effective_category() == category)
                    .cloned()
                    .collect();
                if in_category.is_empty() {
                    return None;
                }

                let stats = Self::calculate_stats(&in_category, now);
                Some(CategoryStats {
                    category,
                    total_cards: stats.total_cards,
                    cards_due: stats.cards_due,
                    cards_new: stats.cards_new,
                    cards_upcoming: stats.cards_upcoming,
                })
            })
            .collect()
    }
}

/// Parses a typed day-count rating. Blank or garbled input becomes 1, numbers are clamped to [1, 999].
pub fn rating_from_input(input: &str) -> u32 {
    let trimmed = input.trim();
    let parsed = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64));

    match parsed {
        Some(value) => value.clamp(i64::from(DEFAULT_DAY_RATING), i64::from(MAX_DAY_RATING)) as u32,
        None => DEFAULT_DAY_RATING,
    }
}

/// The ratings offered for a card once its answer is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingChoices {
    pub retry: u32,
    pub custom: u32,
    pub suggested: u32,
    pub stretch: u32,
}

impl RatingChoices {
    /// `previous_custom` is the value left in the custom field by the previous card.
    pub fn for_card(current_rate: Option<u32>, previous_custom: u32) -> Self {
        let suggested = match current_rate {
            None | Some(0) => 2,
            Some(rate) => rate,
        };
        let stretch = u32::max(3, (f64::from(suggested) * 1.4).floor() as u32);

        // Keep the custom button from duplicating the suggested one.
        let mut custom = previous_custom;
        if current_rate == Some(custom) {
            custom = if custom == 1 { 2 } else { 1 };
        }
        if current_rate == Some(0) && custom == 2 {
            custom = 1;
        }

        RatingChoices {
            retry: 0,
            custom,
            suggested,
            stretch,
        }
    }
}
