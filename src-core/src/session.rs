//! The in-session review batch.
//!
//! A batch is a snapshot of card views taken when the session starts or its filter
//! changes. Ratings are written through to the store and the batch is then edited
//! locally; nothing is read back from storage until the batch is replaced.

use crate::category::CardView;
use crate::models::{CardId, CardUpdate};
use crate::scheduling::{DuePolicy, MAX_DAY_RATING};
use crate::selection::select_next;
use crate::store::{CardStore, StoreError};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing to review.
    Empty,
    Active { index: usize },
}

/// A rating that has been decided but not yet written.
///
/// Carries the batch generation it was made against, so a write that finishes
/// after the batch was replaced only touches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRating {
    pub card_id: CardId,
    pub rate: u32,
    pub due_at: DateTime<Utc>,
    generation: u64,
}

impl PendingRating {
    pub fn update(&self) -> CardUpdate {
        CardUpdate::rating(self.rate, self.due_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateOutcome {
    Rated { card_id: CardId, rate: u32, due_at: DateTime<Utc> },
    /// The card was no longer in the current batch.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewSession {
    batch: Vec<CardView>,
    index: usize,
    generation: u64,
}

impl ReviewSession {
    /// Starts on `preferred` if it is in the batch, otherwise on the card the selector picks.
    pub fn start(batch: Vec<CardView>, preferred: Option<&str>, now: DateTime<Utc>) -> Self {
        let mut session = ReviewSession::default();
        session.load(batch, preferred, now);
        session
    }

    /// Starts on the first card, keeping an order the caller already chose (e.g. shuffled).
    pub fn in_batch_order(batch: Vec<CardView>) -> Self {
        log::info!("Review batch loaded with {} cards", batch.len());
        ReviewSession {
            batch,
            index: 0,
            generation: 0,
        }
    }

    /// Swaps in a new batch, e.g. after the category or due filter changed.
    pub fn replace_batch(&mut self, batch: Vec<CardView>, preferred: Option<&str>, now: DateTime<Utc>) {
        self.generation += 1;
        self.load(batch, preferred, now);
    }

    fn load(&mut self, batch: Vec<CardView>, preferred: Option<&str>, now: DateTime<Utc>) {
        self.batch = batch;
        let preferred_index = preferred.and_then(|id| self.position(id));
        self.index = preferred_index.or_else(|| select_next(&self.batch, None, now)).unwrap_or(0);
        if self.index >= self.batch.len() {
            self.index = 0;
        }
        log::info!("Review batch loaded with {} cards", self.batch.len());
    }

    pub fn state(&self) -> SessionState {
        if self.batch.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Active { index: self.index }
        }
    }

    pub fn current(&self) -> Option<&CardView> {
        self.batch.get(self.index)
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn batch(&self) -> &[CardView] {
        &self.batch
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn position(&self, card_id: &str) -> Option<usize> {
        self.batch.iter().position(|view| view.card_id == card_id)
    }

    /// Moves to the next card in batch order, wrapping at the end.
    pub fn skip(&mut self) {
        if self.batch.is_empty() {
            self.index = 0;
            return;
        }
        self.index = (self.index + 1) % self.batch.len();
    }

    /// Lets the selector pick the next card, never the current one while there is a choice.
    pub fn select_next(&mut self, now: DateTime<Utc>) {
        self.index = select_next(&self.batch, Some(self.index), now).unwrap_or(0);
        log::debug!("Selector moved to index {}", self.index);
    }

    /// Defers the current card by `step` positions (negative moves it back).
    ///
    /// The slot is computed over the batch length including the moved card. The card
    /// that slides into the current slot becomes the one shown next. Returns the new
    /// position of the moved card.
    pub fn move_current(&mut self, step: i64) -> Option<usize> {
        if self.index >= self.batch.len() {
            return None;
        }

        let length = self.batch.len() as i64;
        let card = self.batch.remove(self.index);
        let insert_at = (self.index as i64 + step).rem_euclid(length) as usize;
        log::debug!("Moving card {} from {} to {}", card.card_id, self.index, insert_at);
        self.batch.insert(insert_at, card);
        Some(insert_at)
    }

    /// Decides the rating for the current card without touching the batch.
    pub fn prepare_rating(&self, rating: u32, now: DateTime<Utc>) -> Option<PendingRating> {
        let card_id = self.current()?.card_id.clone();
        self.prepare_rating_for(&card_id, rating, now)
    }

    pub fn prepare_rating_for(&self, card_id: &str, rating: u32, now: DateTime<Utc>) -> Option<PendingRating> {
        self.position(card_id)?;
        let rating = rating.min(MAX_DAY_RATING);
        Some(PendingRating {
            card_id: card_id.to_string(),
            rate: rating,
            due_at: DuePolicy::due_at(rating, now),
            generation: self.generation,
        })
    }

    /// Removes a card whose rating was written successfully.
    ///
    /// The index keeps pointing at the card that slid into the vacated slot, or wraps
    /// to 0 if the last card was removed.
    pub fn apply_rating(&mut self, pending: &PendingRating) -> RateOutcome {
        if pending.generation != self.generation {
            log::debug!("Rating for {} landed after the batch was replaced", pending.card_id);
            return RateOutcome::Stale;
        }
        let Some(position) = self.position(&pending.card_id) else {
            return RateOutcome::Stale;
        };

        let last = self.batch.len() - 1;
        self.batch.remove(position);
        if position < self.index {
            self.index -= 1;
        } else if position == self.index && self.index >= last {
            self.index = 0;
        }
        if self.index >= self.batch.len() {
            self.index = 0;
        }

        RateOutcome::Rated {
            card_id: pending.card_id.clone(),
            rate: pending.rate,
            due_at: pending.due_at,
        }
    }

    /// Rates the current card, writes it through and removes it from the batch.
    pub async fn rate_current(&mut self, store: &dyn CardStore, rating: u32, now: DateTime<Utc>) -> Result<RateOutcome, StoreError> {
        match self.current() {
            Some(view) => {
                let card_id = view.card_id.clone();
                self.rate_card(store, &card_id, rating, now).await
            }
            None => Ok(RateOutcome::Stale),
        }
    }

    /// Rates a card of this batch by id. A card that is no longer in the batch is left alone.
    ///
    /// On a failed write the batch and index are unchanged so the rating can be retried.
    pub async fn rate_card(
        &mut self,
        store: &dyn CardStore,
        card_id: &str,
        rating: u32,
        now: DateTime<Utc>,
    ) -> Result<RateOutcome, StoreError> {
        let Some(pending) = self.prepare_rating_for(card_id, rating, now) else {
            log::warn!("Ignoring rating for card {} which is not in the batch", card_id);
            return Ok(RateOutcome::Stale);
        };

        if let Err(e) = store.update_card(&pending.card_id, pending.update()).await {
            log::error!("Failed to save rating for card {}: {}", pending.card_id, e);
            return Err(e);
        }

        log::info!("Rated card {} with {}, due {}", pending.card_id, pending.rate, pending.due_at);
        Ok(self.apply_rating(&pending))
    }
}
