//! Picks which card to show next out of an unordered pool.
//!
//! Cards fall into tiers: already due (most overdue first), never rated (pool order),
//! then rated but not yet due (soonest first). Ties keep pool order.

use crate::models::Card;
use chrono::{DateTime, Utc};

/// Anything that carries a due instant can be scheduled.
pub trait Schedulable {
    fn due_at(&self) -> Option<DateTime<Utc>>;
}

impl Schedulable for Card {
    fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Due,
    NeverRated,
    Upcoming,
    Excluded,
}

fn priority<T: Schedulable>(card: &T, excluded: bool, now: DateTime<Utc>) -> (Tier, i64) {
    if excluded {
        return (Tier::Excluded, 0);
    }
    match card.due_at() {
        None => (Tier::NeverRated, 0),
        Some(due) if due <= now => (Tier::Due, due.timestamp_millis()),
        Some(due) => (Tier::Upcoming, due.timestamp_millis()),
    }
}

/// Index of the card to show next, or `None` for an empty pool.
///
/// `exclude` is usually the card just shown. It is only returned when it is the sole card.
pub fn select_next<T: Schedulable>(pool: &[T], exclude: Option<usize>, now: DateTime<Utc>) -> Option<usize> {
    match pool.len() {
        0 => None,
        1 => Some(0),
        _ => pool
            .iter()
            .enumerate()
            .min_by_key(|(index, card)| priority(*card, exclude == Some(*index), now))
            .map(|(index, _)| index),
    }
}

/// The whole pool as a review sequence, best card first.
pub fn review_order<T: Schedulable>(pool: &[T], now: DateTime<Utc>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by_key(|&index| priority(&pool[index], false, now));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn card(id: &str, rate: Option<u32>, due_at: Option<DateTime<Utc>>) -> Card {
        Card {
            id: id.to_string(),
            sides: vec!["front".to_string(), "back".to_string()],
            due_at,
            rate,
            category: None,
        }
    }

    #[test]
    fn test_empty_pool() {
        let pool: Vec<Card> = Vec::new();
        assert_eq!(select_next(&pool, None, Utc::now()), None);
    }

    #[test]
    fn test_single_card_ignores_exclusion() {
        let pool = vec![card("a", None, None)];
        assert_eq!(select_next(&pool, Some(0), Utc::now()), Some(0));
    }

    #[test]
    fn test_excluded_index_never_returned() {
        let now = Utc::now();
        let pool = vec![
            card("a", Some(1), Some(now - Duration::days(3))),
            card("b", None, None),
            card("c", Some(4), Some(now + Duration::days(4))),
        ];
        for exclude in 0..pool.len() {
            let picked = select_next(&pool, Some(exclude), now).unwrap();
            assert_ne!(picked, exclude);
        }
    }

    #[test]
    fn test_most_overdue_wins() {
        let now = Utc::now();
        let pool = vec![
            card("recent", Some(1), Some(now - Duration::minutes(5))),
            card("old", Some(2), Some(now - Duration::days(2))),
            card("fresh", None, None),
        ];
        assert_eq!(select_next(&pool, None, now), Some(1));
    }

    #[test]
    fn test_never_rated_only_without_due_cards() {
        let now = Utc::now();
        let pool = vec![card("fresh", None, None), card("due", Some(1), Some(now - Duration::seconds(1)))];
        assert_eq!(select_next(&pool, None, now), Some(1));

        let pool = vec![card("fresh", None, None), card("later", Some(1), Some(now + Duration::hours(1)))];
        assert_eq!(select_next(&pool, None, now), Some(0));
    }

    #[test]
    fn test_upcoming_cards_never_preempt_due_ones() {
        let now = Utc::now();
        let pool = vec![
            card("soon", Some(1), Some(now + Duration::seconds(1))),
            card("due", Some(30), Some(now - Duration::days(30))),
        ];
        assert_eq!(select_next(&pool, None, now), Some(1));
    }

    #[test]
    fn test_ties_keep_pool_order() {
        let now = Utc::now();
        let due = now - Duration::hours(1);
        let pool = vec![card("a", None, None), card("b", Some(1), Some(due)), card("c", Some(1), Some(due))];
        assert_eq!(select_next(&pool, None, now), Some(1));

        let pool = vec![card("a", None, None), card("b", None, None)];
        assert_eq!(select_next(&pool, None, now), Some(0));
        assert_eq!(select_next(&pool, Some(0), now), Some(1));
    }

    #[test]
    fn test_rating_scenario() {
        let now = Utc::now();
        let mut pool = vec![
            card("a", None, None),
            card("b", Some(1), Some(now - Duration::milliseconds(1000))),
            card("c", Some(2), Some(now + Duration::milliseconds(500_000))),
        ];

        let first = select_next(&pool, None, now).unwrap();
        assert_eq!(pool[first].id, "b");

        pool.remove(first);
        let second = select_next(&pool, None, now).unwrap();
        assert_eq!(pool[second].id, "a");
    }

    #[test]
    fn test_review_order() {
        let now = Utc::now();
        let pool = vec![
            card("later", Some(2), Some(now + Duration::days(2))),
            card("fresh", None, None),
            card("overdue", Some(1), Some(now - Duration::days(1))),
            card("soon", Some(1), Some(now + Duration::hours(1))),
            card("due", Some(1), Some(now - Duration::minutes(1))),
        ];

        let ids: Vec<&str> = review_order(&pool, now).into_iter().map(|i| pool[i].id.as_str()).collect();
        assert_eq!(ids, vec!["overdue", "due", "fresh", "soon", "later"]);
    }
}
