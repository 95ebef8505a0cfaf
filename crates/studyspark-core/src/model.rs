//! Core data model types for StudySpark flashcards.
//!
//! A [`FlashcardRecord`] carries immutable content plus the review state the
//! scheduler owns. [`StudyStats`] and [`Schedule`] expose their fields only
//! through accessors: the scheduler in this crate is their sole writer, and
//! code elsewhere can only build them through validated constructors.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StudyError;

/// Identity of a flashcard.
pub type CardId = Uuid;

/// Lowest ease factor a card can reach.
pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Ease factor of a newly created card.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
/// Shortest review interval, in days.
pub const MIN_INTERVAL_DAYS: f64 = 1.0;

/// Informational difficulty tag; not an input to scheduling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Coarse mastery classification used by the analytics rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryBand {
    /// Mastery of 80% or more.
    Mastered,
    /// Mastery from 50% up to 80%.
    Learning,
    /// Mastery below 50%.
    NeedsReview,
}

impl MasteryBand {
    pub fn from_level(mastery_level: u8) -> Self {
        match mastery_level {
            80.. => MasteryBand::Mastered,
            50..=79 => MasteryBand::Learning,
            _ => MasteryBand::NeedsReview,
        }
    }
}

impl fmt::Display for MasteryBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasteryBand::Mastered => write!(f, "Mastered"),
            MasteryBand::Learning => write!(f, "Learning"),
            MasteryBand::NeedsReview => write!(f, "Needs Review"),
        }
    }
}

/// Usage statistics for one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyStats {
    pub(crate) times_studied: u32,
    pub(crate) times_correct: u32,
    pub(crate) times_incorrect: u32,
    /// Running mean in seconds.
    pub(crate) average_study_time_secs: f64,
    pub(crate) last_studied_at: DateTime<Utc>,
    /// Integer percentage in `0..=100`.
    pub(crate) mastery_level: u8,
    pub(crate) study_sessions: u32,
}

impl StudyStats {
    /// Zeroed statistics for a card created at `created_at`.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            times_studied: 0,
            times_correct: 0,
            times_incorrect: 0,
            average_study_time_secs: 0.0,
            last_studied_at: created_at,
            mastery_level: 0,
            study_sessions: 0,
        }
    }

    /// Rebuild statistics from previously recorded counts.
    ///
    /// The mastery level is derived from the counts rather than accepted as
    /// input, so restored statistics always satisfy the mastery invariant.
    pub fn restore(
        times_correct: u32,
        times_incorrect: u32,
        average_study_time_secs: f64,
        last_studied_at: DateTime<Utc>,
        study_sessions: u32,
    ) -> Result<Self, StudyError> {
        let times_studied = times_correct.checked_add(times_incorrect).ok_or_else(|| {
            StudyError::InvalidInput("times_correct + times_incorrect overflows".into())
        })?;
        let stats = Self {
            times_studied,
            times_correct,
            times_incorrect,
            average_study_time_secs,
            last_studied_at,
            mastery_level: mastery_percent(times_correct, times_studied),
            study_sessions,
        };
        stats.validate()?;
        Ok(stats)
    }

    pub fn times_studied(&self) -> u32 {
        self.times_studied
    }

    pub fn times_correct(&self) -> u32 {
        self.times_correct
    }

    pub fn times_incorrect(&self) -> u32 {
        self.times_incorrect
    }

    pub fn average_study_time_secs(&self) -> f64 {
        self.average_study_time_secs
    }

    pub fn last_studied_at(&self) -> DateTime<Utc> {
        self.last_studied_at
    }

    pub fn mastery_level(&self) -> u8 {
        self.mastery_level
    }

    pub fn study_sessions(&self) -> u32 {
        self.study_sessions
    }

    pub fn mastery_band(&self) -> MasteryBand {
        MasteryBand::from_level(self.mastery_level)
    }

    /// Check the statistics invariants.
    pub fn validate(&self) -> Result<(), StudyError> {
        if u64::from(self.times_studied)
            != u64::from(self.times_correct) + u64::from(self.times_incorrect)
        {
            return Err(StudyError::InvalidInput(format!(
                "times_studied ({}) != times_correct ({}) + times_incorrect ({})",
                self.times_studied, self.times_correct, self.times_incorrect
            )));
        }
        if !self.average_study_time_secs.is_finite() || self.average_study_time_secs < 0.0 {
            return Err(StudyError::InvalidInput(format!(
                "average_study_time_secs must be a non-negative number, got {}",
                self.average_study_time_secs
            )));
        }
        let expected = mastery_percent(self.times_correct, self.times_studied);
        if self.mastery_level != expected {
            return Err(StudyError::InvalidInput(format!(
                "mastery_level {} does not match {} correct of {} studied (expected {expected})",
                self.mastery_level, self.times_correct, self.times_studied
            )));
        }
        Ok(())
    }
}

/// Spaced-repetition schedule for one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub(crate) next_review_at: DateTime<Utc>,
    pub(crate) interval_days: f64,
    pub(crate) ease_factor: f64,
    pub(crate) consecutive_correct: u32,
}

impl Schedule {
    /// Schedule of a new card: due immediately, one-day interval, ease 2.5.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            next_review_at: now,
            interval_days: MIN_INTERVAL_DAYS,
            ease_factor: DEFAULT_EASE_FACTOR,
            consecutive_correct: 0,
        }
    }

    /// Rebuild a schedule from stored values, rejecting out-of-range ones.
    pub fn restore(
        next_review_at: DateTime<Utc>,
        interval_days: f64,
        ease_factor: f64,
        consecutive_correct: u32,
    ) -> Result<Self, StudyError> {
        let schedule = Self {
            next_review_at,
            interval_days,
            ease_factor,
            consecutive_correct,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn next_review_at(&self) -> DateTime<Utc> {
        self.next_review_at
    }

    pub fn interval_days(&self) -> f64 {
        self.interval_days
    }

    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    /// Check the schedule invariants.
    pub fn validate(&self) -> Result<(), StudyError> {
        if !self.interval_days.is_finite() || self.interval_days < MIN_INTERVAL_DAYS {
            return Err(StudyError::InvalidInput(format!(
                "interval_days must be at least {MIN_INTERVAL_DAYS}, got {}",
                self.interval_days
            )));
        }
        if !self.ease_factor.is_finite() || self.ease_factor < MIN_EASE_FACTOR {
            return Err(StudyError::InvalidInput(format!(
                "ease_factor must be at least {MIN_EASE_FACTOR}, got {}",
                self.ease_factor
            )));
        }
        Ok(())
    }
}

/// One learnable question/answer pair and its review state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardRecord {
    /// Unique identifier.
    pub id: CardId,
    /// User who owns (created) the card.
    pub owner_id: String,
    pub topic: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub(crate) stats: StudyStats,
    pub(crate) schedule: Schedule,
    /// Inactive cards are never selected as due.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Optimistic-concurrency counter, bumped by the store on each update.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl FlashcardRecord {
    /// Create a card in its initial review state.
    pub fn new(
        owner_id: impl Into<String>,
        topic: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            topic: topic.into(),
            question: question.into(),
            answer: answer.into(),
            difficulty: Difficulty::default(),
            category: None,
            tags: Vec::new(),
            stats: StudyStats::new(now),
            schedule: Schedule::new(now),
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: CardId) -> Self {
        self.id = id;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Replace the review state wholesale. Test fixtures only; outside this
    /// crate the scheduler is the sole writer of review state.
    #[cfg(test)]
    pub(crate) fn with_review_state(mut self, stats: StudyStats, schedule: Schedule) -> Self {
        self.stats = stats;
        self.schedule = schedule;
        self
    }

    /// Review statistics. Read-only outside this crate:
    ///
    /// ```compile_fail
    /// use chrono::Utc;
    /// use studyspark_core::{FlashcardRecord, Schedule, StudyStats};
    ///
    /// let now = Utc::now();
    /// let _ = FlashcardRecord::new("alice", "sql", "q", "a", now)
    ///     .with_review_state(StudyStats::new(now), Schedule::new(now));
    /// ```
    pub fn stats(&self) -> &StudyStats {
        &self.stats
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Whether the card should be offered for review at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.schedule.next_review_at <= now
    }

    /// Check every review-state invariant.
    pub fn validate(&self) -> Result<(), StudyError> {
        self.stats.validate()?;
        self.schedule.validate()
    }
}

/// `round(100 * correct / studied)` with halves rounded up; 0 when nothing was studied.
pub(crate) fn mastery_percent(times_correct: u32, times_studied: u32) -> u8 {
    if times_studied == 0 {
        return 0;
    }
    let correct = u64::from(times_correct.min(times_studied));
    let studied = u64::from(times_studied);
    // (200c + n) / 2n == floor(100c/n + 1/2)
    ((200 * correct + studied) / (2 * studied)) as u8
}
