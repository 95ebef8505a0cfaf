//! Analytics snapshots with JSON persistence and mastery regression detection.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::FlashcardRecord;
use crate::statistics::{compute_aggregate_stats, compute_topic_mastery, AggregateStats};

/// A point-in-time analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    /// Unique snapshot identifier.
    pub id: Uuid,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Owner the snapshot was restricted to, if any.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Aggregate statistics.
    pub aggregate: AggregateStats,
    /// Average mastery of every topic. `aggregate.topics` only holds the
    /// busiest ones, so comparisons use this map.
    #[serde(default)]
    pub topic_mastery: BTreeMap<String, f64>,
}

impl AnalyticsSnapshot {
    /// Take a snapshot of `cards`.
    pub fn capture(cards: &[FlashcardRecord], owner_id: Option<&str>, now: DateTime<Utc>) -> Self {
        let owned: Vec<FlashcardRecord>;
        let cards = match owner_id {
            Some(owner) => {
                owned = cards
                    .iter()
                    .filter(|c| c.owner_id == owner)
                    .cloned()
                    .collect();
                &owned[..]
            }
            None => cards,
        };
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            owner_id: owner_id.map(str::to_string),
            aggregate: compute_aggregate_stats(cards),
            topic_mastery: compute_topic_mastery(cards),
        }
    }

    /// Save the snapshot as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
        let snapshot: AnalyticsSnapshot =
            serde_json::from_str(&content).context("failed to parse snapshot JSON")?;
        Ok(snapshot)
    }

    /// Compare per-topic mastery against a baseline snapshot.
    ///
    /// `threshold` is in mastery percentage points. Snapshots saved without a
    /// full topic map fall back to the top topics of their aggregate.
    pub fn compare(&self, baseline: &AnalyticsSnapshot, threshold: f64) -> MasteryComparison {
        let mastery_map = |snapshot: &AnalyticsSnapshot| -> HashMap<String, f64> {
            if !snapshot.topic_mastery.is_empty() {
                return snapshot
                    .topic_mastery
                    .iter()
                    .map(|(topic, &mastery)| (topic.clone(), mastery))
                    .collect();
            }
            snapshot
                .aggregate
                .topics
                .iter()
                .map(|t| (t.topic.clone(), t.avg_mastery_level))
                .collect()
        };

        let baseline_mastery = mastery_map(baseline);
        let current_mastery = mastery_map(self);

        let mut regressions = Vec::new();
        let mut improvements = Vec::new();
        let mut unchanged = 0usize;
        let mut new_topics = 0usize;

        for (topic, &current) in &current_mastery {
            let Some(&baseline_val) = baseline_mastery.get(topic) else {
                new_topics += 1;
                continue;
            };
            let delta = current - baseline_val;
            let change = TopicChange {
                topic: topic.clone(),
                baseline_mastery: baseline_val,
                current_mastery: current,
                delta,
            };
            if delta < -threshold {
                regressions.push(change);
            } else if delta > threshold {
                improvements.push(change);
            } else {
                unchanged += 1;
            }
        }

        regressions.sort_by(|a, b| a.delta.total_cmp(&b.delta));
        improvements.sort_by(|a, b| b.delta.total_cmp(&a.delta));

        let removed_topics = baseline_mastery
            .keys()
            .filter(|k| !current_mastery.contains_key(*k))
            .count();

        MasteryComparison {
            overall_delta: self.aggregate.summary.avg_mastery_level
                - baseline.aggregate.summary.avg_mastery_level,
            regressions,
            improvements,
            unchanged,
            new_topics,
            removed_topics,
        }
    }
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryComparison {
    /// Change in average mastery across all cards.
    pub overall_delta: f64,
    /// Topics whose mastery dropped by more than the threshold.
    pub regressions: Vec<TopicChange>,
    /// Topics whose mastery rose by more than the threshold.
    pub improvements: Vec<TopicChange>,
    /// Topics within the threshold.
    pub unchanged: usize,
    /// Topics only in the current snapshot.
    pub new_topics: usize,
    /// Topics only in the baseline snapshot.
    pub removed_topics: usize,
}

/// Mastery movement of one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicChange {
    pub topic: String,
    pub baseline_mastery: f64,
    pub current_mastery: f64,
    pub delta: f64,
}

impl MasteryComparison {
    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} regressions, {} improvements, {} unchanged (overall {:+.1} points)\n\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged,
            self.overall_delta
        ));

        for (title, changes) in [
            ("Regressions", &self.regressions),
            ("Improvements", &self.improvements),
        ] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Topic | Baseline | Current | Delta |\n");
            md.push_str("|-------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {:+.1} |\n",
                    c.topic, c.baseline_mastery, c.current_mastery, c.delta
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if any topic regressed.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}
