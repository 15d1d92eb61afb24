use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

pub type CardId = String;
pub type GroupId = String;

pub const MIN_SIDES: usize = 2;
pub const MAX_SIDES: usize = 10;

/// Id of the single settings record.
pub const SETTINGS_ID: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "EN to NL")]
    EnToNl,
    #[serde(rename = "NL to EN")]
    NlToEn,
    #[serde(rename = "Question NL")]
    QuestionNl,
    #[serde(rename = "Dev")]
    Dev,
}

impl Category {
    /// Every category in the order it is offered to the user.
    pub const ALL: [Category; 4] = [Category::EnToNl, Category::NlToEn, Category::QuestionNl, Category::Dev];

    /// Where a study screen lands when its selected category runs dry.
    pub const FALLBACK_ORDER: [Category; 3] = [Category::EnToNl, Category::QuestionNl, Category::Dev];

    pub fn label(self) -> &'static str {
        match self {
            Category::EnToNl => "EN to NL",
            Category::NlToEn => "NL to EN",
            Category::QuestionNl => "Question NL",
            Category::Dev => "Dev",
        }
    }

    /// The stored category a synthetic category is derived from.
    pub fn mirrors(self) -> Option<Category> {
        match self {
            Category::NlToEn => Some(Category::EnToNl),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "entonl" => Ok(Category::EnToNl),
            "nltoen" => Ok(Category::NlToEn),
            "questionnl" => Ok(Category::QuestionNl),
            "dev" => Ok(Category::Dev),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// A flashcard as it is persisted and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub sides: Vec<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Card {
    /// Builds a never-rated card. Blank sides are dropped before the side count is checked.
    pub fn new<S: Into<String>>(sides: Vec<S>, category: Option<Category>) -> Result<Self, ValidationError> {
        let sides: Vec<String> = sides
            .into_iter()
            .map(Into::into)
            .filter(|side: &String| !side.trim().is_empty())
            .collect();

        let card = Card {
            id: Uuid::new_v4().to_string(),
            sides,
            due_at: None,
            rate: None,
            category,
        };
        card.validate()?;
        Ok(card)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_SIDES..=MAX_SIDES).contains(&self.sides.len()) {
            return Err(ValidationError::SideCount(self.sides.len()));
        }
        Ok(())
    }

    pub fn effective_category(&self) -> Category {
        self.category.unwrap_or_default()
    }

    pub fn front(&self) -> &str {
        self.sides.first().map(String::as_str).unwrap_or_default()
    }

    pub fn back(&self) -> &str {
        self.sides.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn is_rated(&self) -> bool {
        self.rate.is_some()
    }
}

/// Partial card write. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardUpdate {
    pub rate: Option<u32>,
    pub due_at: Option<DateTime<Utc>>,
}

impl CardUpdate {
    pub fn rating(rate: u32, due_at: DateTime<Utc>) -> Self {
        CardUpdate {
            rate: Some(rate),
            due_at: Some(due_at),
        }
    }

    pub fn due_at(due_at: DateTime<Utc>) -> Self {
        CardUpdate {
            rate: None,
            due_at: Some(due_at),
        }
    }

    pub fn apply_to(&self, card: &mut Card) {
        if let Some(rate) = self.rate {
            card.rate = Some(rate);
        }
        if let Some(due_at) = self.due_at {
            card.due_at = Some(due_at);
        }
    }
}

/// A named set of card ids. Cards are referenced weakly and may have been deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub card_ids: IndexSet<CardId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_group_id: Option<GroupId>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            id: SETTINGS_ID.to_string(),
            default_group_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_cards: usize,
    pub cards_due: usize,
    pub cards_new: usize,
    pub cards_upcoming: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: Category,
    pub total_cards: usize,
    pub cards_due: usize,
    pub cards_new: usize,
    pub cards_upcoming: usize,
}
