//! The storage collaborator the engine reads cards and groups from and writes ratings back to.
//!
//! Every call is independent; nothing here promises multi-record atomicity.

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use crate::error::ValidationError;
use crate::models::{Card, CardUpdate, Group, Settings};
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid data in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn list_cards(&self) -> StoreResult<Vec<Card>>;

    async fn get_card(&self, id: &str) -> StoreResult<Option<Card>>;

    /// Applies a partial update and returns the stored card. Unknown ids are `NotFound`.
    async fn update_card(&self, id: &str, update: CardUpdate) -> StoreResult<Card>;

    async fn list_groups(&self) -> StoreResult<Vec<Group>>;

    async fn get_group(&self, id: &str) -> StoreResult<Option<Group>>;

    /// Inserts or replaces a group by id.
    async fn put_group(&self, group: Group) -> StoreResult<()>;

    /// The settings record, or its default if none was ever written.
    async fn get_settings(&self) -> StoreResult<Settings>;

    async fn put_settings(&self, settings: Settings) -> StoreResult<()>;
}
