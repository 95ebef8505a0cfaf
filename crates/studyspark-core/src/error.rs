//! Review error types.
//!
//! Store implementations return these wrapped in `anyhow::Error`; the review
//! service downcasts them to decide how a failure is surfaced, without string
//! matching.

use thiserror::Error;

use crate::model::CardId;

/// Errors surfaced by the scheduler, the review service, and the stores.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StudyError {
    /// The card id does not resolve to a stored record.
    #[error("flashcard not found: {0}")]
    NotFound(CardId),

    /// The review input or the stored card state is invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Another writer updated the card since it was read.
    #[error("concurrent modification of flashcard {id}: expected version {expected}, found {found}")]
    ConcurrentModification {
        id: CardId,
        expected: u64,
        found: u64,
    },

    /// The persistence collaborator failed for another reason.
    #[error("storage error: {0}")]
    Storage(String),
}

impl StudyError {
    /// Returns `true` if re-reading the card and re-applying the review may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StudyError::ConcurrentModification { .. })
    }

    /// Classify an error coming back from a store.
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast::<StudyError>() {
            Ok(study) => study,
            Err(other) => StudyError::Storage(format!("{other:#}")),
        }
    }
}
