//! Core trait definitions for persistence and time.
//!
//! Stores are implemented by the `studyspark-store` crate. The review service
//! only ever talks to them through [`FlashcardStore`].

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::model::{CardId, FlashcardRecord};
use crate::scheduler::select_due;

// ---------------------------------------------------------------------------
// Persistence trait
// ---------------------------------------------------------------------------

/// Persistence collaborator for flashcards.
///
/// Errors are `anyhow` errors; failures with a review meaning (missing card,
/// version conflict) carry a [`crate::StudyError`] that callers can downcast.
#[async_trait]
pub trait FlashcardStore: Send + Sync {
    /// Human-readable backend name (e.g. "memory").
    fn name(&self) -> &str;

    /// Fetch a card by id.
    async fn get(&self, id: CardId) -> anyhow::Result<Option<FlashcardRecord>>;

    /// Insert a new card. Fails if the id is already taken.
    async fn insert(&self, card: FlashcardRecord) -> anyhow::Result<()>;

    /// Atomically replace a card if its stored version equals `expected_version`.
    ///
    /// On success the stored copy gets `expected_version + 1` and is returned.
    /// A missing card yields `StudyError::NotFound`, a version mismatch
    /// `StudyError::ConcurrentModification`; neither changes stored state.
    async fn update(
        &self,
        card: &FlashcardRecord,
        expected_version: u64,
    ) -> anyhow::Result<FlashcardRecord>;

    /// All cards owned by `owner_id`, active or not.
    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<FlashcardRecord>>;

    /// Every stored card.
    async fn list_all(&self) -> anyhow::Result<Vec<FlashcardRecord>>;

    /// Cards of `owner_id` due at `now`, most overdue first, at most `limit`.
    async fn due_cards(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<FlashcardRecord>> {
        let cards = self.list_by_owner(owner_id).await?;
        Ok(select_due(&cards, owner_id, now, limit))
    }
}

// ---------------------------------------------------------------------------
// Clock trait
// ---------------------------------------------------------------------------

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
