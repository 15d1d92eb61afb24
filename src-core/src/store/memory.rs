use super::{CardStore, StoreError, StoreResult};
use crate::models::{Card, CardUpdate, Group, Settings};
use async_trait::async_trait;
use std::sync::Mutex;

/// Keeps everything in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cards: Mutex<Vec<Card>>,
    groups: Mutex<Vec<Group>>,
    settings: Mutex<Option<Settings>>,
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Unavailable(format!("Failed to lock {}", what))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        MemoryStore {
            cards: Mutex::new(cards),
            ..Self::default()
        }
    }

    pub fn insert_card(&self, card: Card) -> StoreResult<()> {
        let mut cards = self.cards.lock().map_err(|_| poisoned("cards"))?;
        match cards.iter_mut().find(|existing| existing.id == card.id) {
            Some(existing) => *existing = card,
            None => cards.push(card),
        }
        Ok(())
    }

    pub fn delete_card(&self, id: &str) -> StoreResult<()> {
        let mut cards = self.cards.lock().map_err(|_| poisoned("cards"))?;
        let before = cards.len();
        cards.retain(|card| card.id != id);
        if cards.len() == before {
            return Err(StoreError::NotFound(format!("card {}", id)));
        }
        Ok(())
    }

    pub fn delete_group(&self, id: &str) -> StoreResult<()> {
        let mut groups = self.groups.lock().map_err(|_| poisoned("groups"))?;
        let before = groups.len();
        groups.retain(|group| group.id != id);
        if groups.len() == before {
            return Err(StoreError::NotFound(format!("group {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn list_cards(&self) -> StoreResult<Vec<Card>> {
        let cards = self.cards.lock().map_err(|_| poisoned("cards"))?;
        Ok(cards.clone())
    }

    async fn get_card(&self, id: &str) -> StoreResult<Option<Card>> {
        let cards = self.cards.lock().map_err(|_| poisoned("cards"))?;
        Ok(cards.iter().find(|card| card.id == id).cloned())
    }

    async fn update_card(&self, id: &str, update: CardUpdate) -> StoreResult<Card> {
        let mut cards = self.cards.lock().map_err(|_| poisoned("cards"))?;
        let card = cards
            .iter_mut()
            .find(|card| card.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("card {}", id)))?;
        update.apply_to(card);
        Ok(card.clone())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let groups = self.groups.lock().map_err(|_| poisoned("groups"))?;
        Ok(groups.clone())
    }

    async fn get_group(&self, id: &str) -> StoreResult<Option<Group>> {
        let groups = self.groups.lock().map_err(|_| poisoned("groups"))?;
        Ok(groups.iter().find(|group| group.id == id).cloned())
    }

    async fn put_group(&self, group: Group) -> StoreResult<()> {
        let mut groups = self.groups.lock().map_err(|_| poisoned("groups"))?;
        match groups.iter_mut().find(|existing| existing.id == group.id) {
            Some(existing) => *existing = group,
            None => groups.push(group),
        }
        Ok(())
    }

    async fn get_settings(&self) -> StoreResult<Settings> {
        let settings = self.settings.lock().map_err(|_| poisoned("settings"))?;
        Ok(settings.clone().unwrap_or_default())
    }

    async fn put_settings(&self, settings: Settings) -> StoreResult<()> {
        let mut current = self.settings.lock().map_err(|_| poisoned("settings"))?;
        *current = Some(settings);
        Ok(())
    }
}
