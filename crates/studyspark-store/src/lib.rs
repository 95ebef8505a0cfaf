//! studyspark-store: Flashcard persistence backends.
//!
//! Implements the `FlashcardStore` trait over an in-memory map and over a
//! JSON file, both with per-card compare-and-swap updates.

pub mod config;
pub mod error;
pub mod json;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, StoreConfig, StudySparkConfig};
pub use error::StoreError;
pub use json::JsonFileStore;
pub use memory::InMemoryStore;
