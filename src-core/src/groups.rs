//! Group membership and the default group.
//!
//! Groups hold card ids only. A member whose card was deleted is skipped when the
//! group is resolved, never treated as an error.

use crate::models::{Card, CardId, CardUpdate, Group, GroupId, Settings};
use crate::store::{CardStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use uuid::Uuid;

/// How many never-rated or retry cards a new group is picked from.
pub const DRAFT_CANDIDATE_LIMIT: usize = 50;

/// How many candidates a new group starts with.
pub const DRAFT_PRESELECTED: usize = 7;

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Group {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            card_ids: IndexSet::new(),
        }
    }

    /// Returns false if the card was already a member.
    pub fn add_card(&mut self, card_id: impl Into<CardId>) -> bool {
        self.card_ids.insert(card_id.into())
    }

    pub fn remove_card(&mut self, card_id: &str) -> bool {
        self.card_ids.shift_remove(card_id)
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.card_ids.contains(card_id)
    }
}

impl Settings {
    pub fn is_default(&self, group_id: &str) -> bool {
        self.default_group_id.as_deref() == Some(group_id)
    }

    /// Makes `group_id` the default, replacing whichever group held it.
    pub fn set_default(&mut self, group_id: impl Into<GroupId>) {
        self.default_group_id = Some(group_id.into());
    }

    /// Clears the default only if `group_id` currently holds it.
    pub fn clear_default_if(&mut self, group_id: &str) -> bool {
        if self.is_default(group_id) {
            self.default_group_id = None;
            true
        } else {
            false
        }
    }
}

/// Result of the quick "add to default group" action, shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToGroupOutcome {
    pub success: bool,
    pub message: String,
}

impl AddToGroupOutcome {
    fn success(message: impl Into<String>) -> Self {
        AddToGroupOutcome {
            success: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        AddToGroupOutcome {
            success: false,
            message: message.into(),
        }
    }
}

/// Adds a card to the default group. Never fails; every problem becomes a message.
pub async fn add_to_default_group(store: &dyn CardStore, card_id: &str) -> AddToGroupOutcome {
    match try_add_to_default_group(store, card_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Error adding card {} to default group: {}", card_id, e);
            AddToGroupOutcome::failure("Failed to add to default group.")
        }
    }
}

async fn try_add_to_default_group(store: &dyn CardStore, card_id: &str) -> StoreResult<AddToGroupOutcome> {
    let settings = store.get_settings().await?;
    let Some(group_id) = settings.default_group_id else {
        return Ok(AddToGroupOutcome::failure("No default group set."));
    };

    let Some(mut group) = store.get_group(&group_id).await? else {
        log::warn!("Default group {} no longer exists", group_id);
        return Ok(AddToGroupOutcome::failure("Default group not found (maybe deleted)."));
    };

    if !group.add_card(card_id) {
        return Ok(AddToGroupOutcome::success("Card already in default group."));
    }

    let message = format!("Added to default group: \"{}\"", group.name);
    store.put_group(group).await?;
    log::info!("Added card {} to default group {}", card_id, group_id);
    Ok(AddToGroupOutcome::success(message))
}

/// Makes a group the default. The group has to exist.
pub async fn mark_default(store: &dyn CardStore, group_id: &str) -> StoreResult<()> {
    if store.get_group(group_id).await?.is_none() {
        return Err(StoreError::NotFound(format!("group {}", group_id)));
    }

    let mut settings = store.get_settings().await?;
    settings.set_default(group_id);
    store.put_settings(settings).await?;
    log::info!("Group {} is now the default group", group_id);
    Ok(())
}

/// Removes the default mark if `group_id` holds it. Returns whether anything changed.
pub async fn unmark_default(store: &dyn CardStore, group_id: &str) -> StoreResult<bool> {
    let mut settings = store.get_settings().await?;
    if !settings.clear_default_if(group_id) {
        return Ok(false);
    }
    store.put_settings(settings).await?;
    Ok(true)
}

/// Looks up a group's cards in membership order, skipping ids that no longer resolve.
pub async fn resolve_group_cards(store: &dyn CardStore, group: &Group) -> StoreResult<Vec<Card>> {
    let mut cards = Vec::with_capacity(group.card_ids.len());
    for card_id in &group.card_ids {
        match store.get_card(card_id).await? {
            Some(card) => cards.push(card),
            None => log::debug!("Group {} references missing card {}", group.id, card_id),
        }
    }
    Ok(cards)
}

/// Makes rated cards due right away. Never-rated and missing cards are skipped.
/// Returns how many cards were updated.
pub async fn set_cards_due_now<'a, I>(store: &dyn CardStore, card_ids: I, now: DateTime<Utc>) -> StoreResult<usize>
where
    I: IntoIterator<Item = &'a CardId>,
{
    let mut updated = 0;
    for card_id in card_ids {
        match store.get_card(card_id).await? {
            Some(card) if card.is_rated() => {
                store.update_card(card_id, CardUpdate::due_at(now)).await?;
                updated += 1;
            }
            _ => {}
        }
    }
    Ok(updated)
}

/// Makes every rated card of every group due right away.
pub async fn set_all_groups_due_now(store: &dyn CardStore, now: DateTime<Utc>) -> StoreResult<usize> {
    let groups = store.list_groups().await?;
    let card_ids: IndexSet<CardId> = groups.into_iter().flat_map(|group| group.card_ids).collect();
    let updated = set_cards_due_now(store, &card_ids, now).await?;
    log::info!("Set {} group cards due now", updated);
    Ok(updated)
}

fn is_draft_candidate(card: &Card) -> bool {
    matches!(card.rate, None | Some(0))
}

/// A group being created or edited.
///
/// Removing a selected card pulls in the first unselected candidate, until the user
/// adds a card by hand.
#[derive(Debug, Clone)]
pub struct GroupDraft {
    group_id: Option<GroupId>,
    name: Option<String>,
    candidates: Vec<Card>,
    selected: IndexSet<CardId>,
    manual_override: bool,
    pub make_default: bool,
}

impl GroupDraft {
    /// Draft for a new group from the never-rated and retry cards.
    pub fn create(cards: &[Card]) -> Self {
        let candidates: Vec<Card> = cards
            .iter()
            .filter(|card| is_draft_candidate(card))
            .take(DRAFT_CANDIDATE_LIMIT)
            .cloned()
            .collect();
        let selected = candidates.iter().take(DRAFT_PRESELECTED).map(|card| card.id.clone()).collect();

        GroupDraft {
            group_id: None,
            name: None,
            candidates,
            selected,
            manual_override: false,
            make_default: false,
        }
    }

    /// Draft for an existing group: its resolvable members first, then fresh candidates.
    pub fn edit(group: &Group, cards: &[Card], settings: &Settings) -> Self {
        let mut candidates: Vec<Card> = group
            .card_ids
            .iter()
            .filter_map(|id| cards.iter().find(|card| &card.id == id))
            .cloned()
            .collect();
        let selected = candidates.iter().map(|card| card.id.clone()).collect();
        candidates.extend(
            cards
                .iter()
                .filter(|card| !group.contains(&card.id) && is_draft_candidate(card))
                .take(DRAFT_CANDIDATE_LIMIT)
                .cloned(),
        );

        GroupDraft {
            group_id: Some(group.id.clone()),
            name: Some(group.name.clone()),
            candidates,
            selected,
            manual_override: false,
            make_default: settings.is_default(&group.id),
        }
    }

    pub fn candidates(&self) -> &[Card] {
        &self.candidates
    }

    pub fn selected(&self) -> impl Iterator<Item = &CardId> {
        self.selected.iter()
    }

    pub fn is_selected(&self, card_id: &str) -> bool {
        self.selected.contains(card_id)
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Selects a candidate. Adding by hand turns off auto-replacement, even for a card
    /// that was already selected.
    pub fn add(&mut self, card_id: &str) -> bool {
        if !self.candidates.iter().any(|card| card.id == card_id) {
            return false;
        }
        self.manual_override = true;
        self.selected.insert(card_id.to_string())
    }

    /// Drops a card from both the selection and the candidate list.
    pub fn remove(&mut self, card_id: &str) {
        self.candidates.retain(|card| card.id != card_id);
        let was_selected = self.selected.shift_remove(card_id);

        if was_selected && !self.manual_override {
            if let Some(replacement) = self.candidates.iter().find(|card| !self.selected.contains(&card.id)) {
                self.selected.insert(replacement.id.clone());
            }
        }
    }

    /// Explicit name, or `"<Mon> <day> <word>"` built from the first selected card.
    pub fn name(&self, now: DateTime<Utc>) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }

        let expression = self
            .selected
            .first()
            .and_then(|id| self.candidates.iter().find(|card| &card.id == id))
            .map(|card| card.front());
        let word = match expression {
            Some(expression) if !expression.is_empty() => {
                let mut words = expression.split(' ');
                let first = words.next().unwrap_or_default();
                words.next().unwrap_or(first).to_string()
            }
            _ => "A".to_string(),
        };

        format!("{} {}", now.format("%b %-d"), word)
    }

    pub fn into_group(self, now: DateTime<Utc>) -> Group {
        let name = self.name(now);
        Group {
            id: self.group_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name,
            card_ids: self.selected,
        }
    }
}

/// Saves a draft: members are made due now, the group is written, and the default
/// mark follows `make_default`.
pub async fn save_group_draft(store: &dyn CardStore, draft: GroupDraft, now: DateTime<Utc>) -> StoreResult<Group> {
    let make_default = draft.make_default;
    let group = draft.into_group(now);

    set_cards_due_now(store, &group.card_ids, now).await?;
    store.put_group(group.clone()).await?;

    if make_default {
        let mut settings = store.get_settings().await?;
        settings.set_default(group.id.clone());
        store.put_settings(settings).await?;
    } else {
        unmark_default(store, &group.id).await?;
    }

    log::info!("Saved group {} ({} cards)", group.name, group.card_ids.len());
    Ok(group)
}
