//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

use studyspark_core::model::CardId;

/// Backend failures that have no review meaning of their own.
///
/// Missing cards and version conflicts are reported as
/// `studyspark_core::StudyError` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A card with this id is already stored.
    #[error("flashcard already exists: {0}")]
    DuplicateId(CardId),

    /// The data file exists but could not be decoded.
    #[error("corrupt data file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The data file was written by an incompatible format version.
    #[error("unsupported data format version {found} in {path} (expected {expected})")]
    UnsupportedFormat {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
