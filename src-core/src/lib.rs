//! Review scheduling and session engine for the Spaced Out flashcard app.
//!
//! The engine works on a flat card collection handed over by a [`store::CardStore`]
//! and writes ratings back through it. Rendering is left to the caller.

pub mod category;
pub mod commands;
pub mod config;
pub mod error;
pub mod groups;
pub mod models;
pub mod scheduling;
pub mod selection;
pub mod session;
pub mod store;

pub use category::{build_batch, category_view, inverse_practice, resolve_category, CardView, DueFilter};
pub use commands::ReviewCommand;
pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use groups::{add_to_default_group, AddToGroupOutcome, GroupDraft};
pub use models::{Card, CardId, CardUpdate, Category, Group, GroupId, Settings};
pub use scheduling::{rating_from_input, DuePolicy, RatingChoices};
pub use selection::{select_next, Schedulable};
pub use session::{RateOutcome, ReviewSession, SessionState};
pub use store::{CardStore, JsonStore, MemoryStore, StoreError};
