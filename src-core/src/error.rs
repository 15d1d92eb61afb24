//! Error types shared across the crate.

use crate::config::ConfigError;
use crate::store::StoreError;

/// Input the engine refuses to accept.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("A card needs between 2 and 10 sides, got {0}")]
    SideCount(usize),

    #[error("Duplicate card id: {0}")]
    DuplicateCardId(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// The primary error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
