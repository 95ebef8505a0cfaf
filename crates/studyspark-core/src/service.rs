//! Review service: the scheduler composed with a store and a clock.
//!
//! Each review is a read-modify-write: read the card, apply
//! [`record_outcome`] with a single captured "now", then compare-and-swap
//! the result back into the store. Reviews of different cards in a batch run
//! concurrently with bounded parallelism.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::StudyError;
use crate::model::{CardId, FlashcardRecord};
use crate::scheduler::{record_outcome, Outcome, DEFAULT_DUE_LIMIT};
use crate::traits::{Clock, FlashcardStore};

/// Configuration for the review service.
#[derive(Debug, Clone)]
pub struct ReviewServiceConfig {
    /// Due-card limit used when the caller gives none.
    pub due_limit: usize,
    /// Maximum concurrent reviews in a batch.
    pub parallelism: usize,
    /// Re-reads allowed after a version conflict on the retrying paths.
    pub max_conflict_retries: u32,
}

impl Default for ReviewServiceConfig {
    fn default() -> Self {
        Self {
            due_limit: DEFAULT_DUE_LIMIT,
            parallelism: 4,
            max_conflict_retries: 3,
        }
    }
}

/// One review to record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub card_id: CardId,
    pub outcome: Outcome,
    #[serde(default)]
    pub study_time_secs: Option<f64>,
}

/// Totals for a batch of reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub recorded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

/// Progress reporting trait for batch reviews.
pub trait ReviewObserver: Send + Sync {
    fn on_review_recorded(&self, card: &FlashcardRecord, outcome: Outcome);
    fn on_review_failed(&self, card_id: CardId, error: &StudyError);
    fn on_batch_complete(&self, total: usize, recorded: usize, failed: usize, elapsed: Duration);
}

/// No-op observer.
pub struct NoopObserver;

impl ReviewObserver for NoopObserver {
    fn on_review_recorded(&self, _: &FlashcardRecord, _: Outcome) {}
    fn on_review_failed(&self, _: CardId, _: &StudyError) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// The review service.
pub struct ReviewService {
    store: Arc<dyn FlashcardStore>,
    clock: Arc<dyn Clock>,
    config: ReviewServiceConfig,
}

impl ReviewService {
    pub fn new(
        store: Arc<dyn FlashcardStore>,
        clock: Arc<dyn Clock>,
        config: ReviewServiceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn FlashcardStore> {
        &self.store
    }

    /// The time source every review and due query reads "now" from.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &ReviewServiceConfig {
        &self.config
    }

    /// Record one review outcome and persist the updated card.
    ///
    /// A concurrent writer makes this fail with
    /// [`StudyError::ConcurrentModification`]; nothing is retried here.
    pub async fn record_outcome(
        &self,
        card_id: CardId,
        outcome: Outcome,
        study_time_secs: Option<f64>,
    ) -> Result<FlashcardRecord, StudyError> {
        let now = self.clock.now();
        let current = self
            .store
            .get(card_id)
            .await
            .map_err(StudyError::from_store)?
            .ok_or(StudyError::NotFound(card_id))?;

        let next = record_outcome(&current, outcome, study_time_secs, now)?;

        self.store
            .update(&next, current.version)
            .await
            .map_err(StudyError::from_store)
    }

    /// Like [`ReviewService::record_outcome`], but re-reads the card and
    /// re-applies the review after a version conflict, up to
    /// `max_conflict_retries` times.
    pub async fn record_outcome_retrying(
        &self,
        card_id: CardId,
        outcome: Outcome,
        study_time_secs: Option<f64>,
    ) -> Result<FlashcardRecord, StudyError> {
        let mut attempt = 0u32;
        loop {
            match self.record_outcome(card_id, outcome, study_time_secs).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    tracing::warn!(%card_id, attempt, "review conflicted, re-reading: {e}");
                }
                result => return result,
            }
        }
    }

    /// Cards of `owner_id` due now, most overdue first.
    pub async fn select_due_cards(
        &self,
        owner_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<FlashcardRecord>, StudyError> {
        let now = self.clock.now();
        let limit = limit.unwrap_or(self.config.due_limit);
        self.store
            .due_cards(owner_id, now, limit)
            .await
            .map_err(StudyError::from_store)
    }

    /// Record a batch of reviews concurrently.
    ///
    /// Each submission goes through the retrying path, so two submissions for
    /// the same card both land, one after the other.
    pub async fn record_batch(
        &self,
        submissions: Vec<ReviewSubmission>,
        observer: &dyn ReviewObserver,
    ) -> BatchSummary {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let total = submissions.len();

        let mut futures = FuturesUnordered::new();
        for submission in submissions {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        self.record_outcome_retrying(
                            submission.card_id,
                            submission.outcome,
                            submission.study_time_secs,
                        )
                        .await
                    }
                    Err(_) => Err(StudyError::Storage("review semaphore closed".into())),
                };
                (submission, result)
            });
        }

        let mut recorded = 0usize;
        let mut failed = 0usize;
        while let Some((submission, result)) = futures.next().await {
            match result {
                Ok(card) => {
                    observer.on_review_recorded(&card, submission.outcome);
                    recorded += 1;
                }
                Err(e) => {
                    tracing::error!("review failed for {}: {e}", submission.card_id);
                    observer.on_review_failed(submission.card_id, &e);
                    failed += 1;
                }
            }
        }

        let elapsed = start.elapsed();
        observer.on_batch_complete(total, recorded, failed, elapsed);

        BatchSummary {
            total,
            recorded,
            failed,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}
