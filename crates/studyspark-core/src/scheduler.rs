//! Spaced-repetition review transition and due-card selection.
//!
//! [`record_outcome`] is a pure function of (card, outcome, study time, now):
//! it validates the incoming state, computes the next state, and returns it
//! as a new record. Persisting that record is the caller's job.
//!
//! Ease/interval rule:
//! - correct: `interval = max(1, interval * ease)`, `ease = max(1.3, ease + 0.1)`
//! - incorrect: `interval = 1`, `ease = max(1.3, ease - 0.2)`

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StudyError;
use crate::model::{mastery_percent, FlashcardRecord, MIN_EASE_FACTOR, MIN_INTERVAL_DAYS};

/// Ease gained by a correct answer.
pub const EASE_REWARD: f64 = 0.1;
/// Ease lost by an incorrect answer.
pub const EASE_PENALTY: f64 = 0.2;
/// Number of cards returned by due-card selection when no limit is given.
pub const DEFAULT_DUE_LIMIT: usize = 20;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Result of a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl Outcome {
    pub fn is_correct(self) -> bool {
        matches!(self, Outcome::Correct)
    }
}

impl From<bool> for Outcome {
    fn from(is_correct: bool) -> Self {
        if is_correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Correct => write!(f, "correct"),
            Outcome::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// Apply one review outcome observed at `now` and return the updated card.
///
/// `study_time_secs` of `None` leaves the average study time untouched;
/// `Some(0.0)` counts as a zero-second sample. The input card is never
/// modified, so a rejected review leaves no partial state behind.
///
/// # Errors
///
/// [`StudyError::InvalidInput`] if the study time is negative or not finite,
/// or if `card` already violates a review-state invariant.
pub fn record_outcome(
    card: &FlashcardRecord,
    outcome: Outcome,
    study_time_secs: Option<f64>,
    now: DateTime<Utc>,
) -> Result<FlashcardRecord, StudyError> {
    if let Some(secs) = study_time_secs {
        if !secs.is_finite() || secs < 0.0 {
            return Err(StudyError::InvalidInput(format!(
                "study time must be a non-negative number of seconds, got {secs}"
            )));
        }
    }
    card.validate()?;

    let mut next = card.clone();
    let stats = &mut next.stats;
    let schedule = &mut next.schedule;

    stats.times_studied = checked_increment(stats.times_studied, "times_studied")?;
    stats.study_sessions = checked_increment(stats.study_sessions, "study_sessions")?;
    stats.last_studied_at = now;

    match outcome {
        Outcome::Correct => {
            stats.times_correct = checked_increment(stats.times_correct, "times_correct")?;
            schedule.consecutive_correct = schedule.consecutive_correct.saturating_add(1);
        }
        Outcome::Incorrect => {
            stats.times_incorrect = checked_increment(stats.times_incorrect, "times_incorrect")?;
            schedule.consecutive_correct = 0;
        }
    }

    // study_sessions already includes this review.
    if let Some(secs) = study_time_secs {
        let n = f64::from(stats.study_sessions);
        stats.average_study_time_secs += (secs - stats.average_study_time_secs) / n;
    }

    stats.mastery_level = mastery_percent(stats.times_correct, stats.times_studied);

    let (interval_days, ease_factor) =
        next_interval_and_ease(schedule.interval_days, schedule.ease_factor, outcome);
    schedule.interval_days = interval_days;
    schedule.ease_factor = ease_factor;
    schedule.next_review_at = add_days(now, interval_days);

    next.updated_at = now;

    tracing::debug!(
        card_id = %next.id,
        %outcome,
        interval_days,
        ease_factor,
        mastery = next.stats.mastery_level,
        "review recorded"
    );

    Ok(next)
}

/// The ease/interval branch of the transition.
pub fn next_interval_and_ease(interval_days: f64, ease_factor: f64, outcome: Outcome) -> (f64, f64) {
    match outcome {
        Outcome::Correct => (
            (interval_days * ease_factor).clamp(MIN_INTERVAL_DAYS, f64::MAX),
            (ease_factor + EASE_REWARD).max(MIN_EASE_FACTOR),
        ),
        Outcome::Incorrect => (
            MIN_INTERVAL_DAYS,
            (ease_factor - EASE_PENALTY).max(MIN_EASE_FACTOR),
        ),
    }
}

/// Latest instant a review can be scheduled for.
///
/// Kept within four-digit years so stored timestamps stay valid RFC 3339.
pub fn review_horizon() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `now + days`, saturating at [`review_horizon`].
fn add_days(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    let horizon = review_horizon();
    let millis = (days * MILLIS_PER_DAY).round();
    let delta = if millis < i64::MAX as f64 {
        TimeDelta::try_milliseconds(millis as i64)
    } else {
        None
    };
    match delta.and_then(|d| now.checked_add_signed(d)) {
        Some(at) if at <= horizon => at,
        _ => {
            tracing::debug!(days, "next review beyond horizon, saturating");
            horizon
        }
    }
}

fn checked_increment(value: u32, field: &str) -> Result<u32, StudyError> {
    value
        .checked_add(1)
        .ok_or_else(|| StudyError::InvalidInput(format!("{field} counter overflow")))
}

/// Select the cards of `owner_id` that are due at `now`.
///
/// Only active cards with `next_review_at <= now` qualify. The result is
/// ordered most-overdue first, with ties broken by card id so that repeated
/// calls over the same state return the same sequence, and truncated to
/// `limit`.
pub fn select_due<'a, I>(
    cards: I,
    owner_id: &str,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<FlashcardRecord>
where
    I: IntoIterator<Item = &'a FlashcardRecord>,
{
    let mut due: Vec<&FlashcardRecord> = cards
        .into_iter()
        .filter(|c| c.owner_id == owner_id && c.is_due(now))
        .collect();
    due.sort_by(|a, b| {
        a.schedule
            .next_review_at
            .cmp(&b.schedule.next_review_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    due.into_iter().take(limit).cloned().collect()
}
