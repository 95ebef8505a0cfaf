//! studyspark-core: Spaced-repetition scheduling and study analytics.
//!
//! This crate defines the flashcard data model, the pure review transition,
//! the persistence and clock traits, and the analytics rollups that the rest
//! of StudySpark builds on.

pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod statistics;
pub mod traits;

pub use error::StudyError;
pub use model::{CardId, Difficulty, FlashcardRecord, MasteryBand, Schedule, StudyStats};
pub use scheduler::{record_outcome, select_due, Outcome};
