//! Mastery analytics over flashcard review state.
//!
//! Rolls up the numeric fields the scheduler maintains: an overall summary,
//! a per-topic breakdown, and a per-mastery-band breakdown. Only active
//! cards are counted.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{FlashcardRecord, MasteryBand};

/// Topics kept in the per-topic breakdown.
pub const TOP_TOPICS: usize = 10;

/// Summary over all active cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashcardAnalytics {
    pub total_flashcards: usize,
    pub total_study_sessions: u64,
    pub total_studied: u64,
    pub total_correct: u64,
    pub total_incorrect: u64,
    /// Mean of per-card mastery levels, in percent.
    pub avg_mastery_level: f64,
    /// Mean of per-card average study times, in seconds.
    pub avg_study_time_secs: f64,
}

/// Statistics for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAnalytics {
    pub topic: String,
    pub flashcard_count: usize,
    pub total_study_sessions: u64,
    pub avg_mastery_level: f64,
    pub avg_study_time_secs: f64,
}

/// Statistics for one mastery band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAnalytics {
    pub band: MasteryBand,
    pub count: usize,
    pub avg_study_time_secs: f64,
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Compute the overall summary.
pub fn compute_flashcard_analytics(cards: &[FlashcardRecord]) -> FlashcardAnalytics {
    let active: Vec<&FlashcardRecord> = cards.iter().filter(|c| c.is_active).collect();
    let n = active.len();

    FlashcardAnalytics {
        total_flashcards: n,
        total_study_sessions: active
            .iter()
            .map(|c| u64::from(c.stats().study_sessions()))
            .sum(),
        total_studied: active
            .iter()
            .map(|c| u64::from(c.stats().times_studied()))
            .sum(),
        total_correct: active
            .iter()
            .map(|c| u64::from(c.stats().times_correct()))
            .sum(),
        total_incorrect: active
            .iter()
            .map(|c| u64::from(c.stats().times_incorrect()))
            .sum(),
        avg_mastery_level: mean(
            active
                .iter()
                .map(|c| f64::from(c.stats().mastery_level()))
                .sum(),
            n,
        ),
        avg_study_time_secs: mean(
            active
                .iter()
                .map(|c| c.stats().average_study_time_secs())
                .sum(),
            n,
        ),
    }
}

/// Every topic's rollup, busiest topics first.
fn all_topic_analytics(cards: &[FlashcardRecord]) -> Vec<TopicAnalytics> {
    let mut grouped: HashMap<&str, Vec<&FlashcardRecord>> = HashMap::new();
    for card in cards.iter().filter(|c| c.is_active) {
        grouped.entry(card.topic.as_str()).or_default().push(card);
    }

    let mut topics: Vec<TopicAnalytics> = grouped
        .into_iter()
        .map(|(topic, group)| {
            let n = group.len();
            TopicAnalytics {
                topic: topic.to_string(),
                flashcard_count: n,
                total_study_sessions: group
                    .iter()
                    .map(|c| u64::from(c.stats().study_sessions()))
                    .sum(),
                avg_mastery_level: mean(
                    group
                        .iter()
                        .map(|c| f64::from(c.stats().mastery_level()))
                        .sum(),
                    n,
                ),
                avg_study_time_secs: mean(
                    group
                        .iter()
                        .map(|c| c.stats().average_study_time_secs())
                        .sum(),
                    n,
                ),
            }
        })
        .collect();

    topics.sort_by(|a, b| {
        b.total_study_sessions
            .cmp(&a.total_study_sessions)
            .then_with(|| a.topic.cmp(&b.topic))
    });
    topics
}

/// Per-topic breakdown, busiest topics first, at most [`TOP_TOPICS`] entries.
pub fn compute_topic_analytics(cards: &[FlashcardRecord]) -> Vec<TopicAnalytics> {
    let mut topics = all_topic_analytics(cards);
    topics.truncate(TOP_TOPICS);
    topics
}

/// Average mastery of every topic, not just the busiest ones.
pub fn compute_topic_mastery(cards: &[FlashcardRecord]) -> BTreeMap<String, f64> {
    all_topic_analytics(cards)
        .into_iter()
        .map(|t| (t.topic, t.avg_mastery_level))
        .collect()
}

/// Per-band breakdown, best band first: Mastered, Learning, Needs Review.
/// Empty bands are omitted.
pub fn compute_mastery_breakdown(cards: &[FlashcardRecord]) -> Vec<BandAnalytics> {
    let mut grouped: BTreeMap<MasteryBand, (usize, f64)> = BTreeMap::new();
    for card in cards.iter().filter(|c| c.is_active) {
        let entry = grouped.entry(card.stats().mastery_band()).or_default();
        entry.0 += 1;
        entry.1 += card.stats().average_study_time_secs();
    }

    grouped
        .into_iter()
        .map(|(band, (count, time_sum))| BandAnalytics {
            band,
            count,
            avg_study_time_secs: mean(time_sum, count),
        })
        .collect()
}

/// All rollups computed together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub summary: FlashcardAnalytics,
    pub topics: Vec<TopicAnalytics>,
    pub mastery: Vec<BandAnalytics>,
}

/// Compute every rollup over `cards`.
pub fn compute_aggregate_stats(cards: &[FlashcardRecord]) -> AggregateStats {
    AggregateStats {
        summary: compute_flashcard_analytics(cards),
        topics: compute_topic_analytics(cards),
        mastery: compute_mastery_breakdown(cards),
    }
}
