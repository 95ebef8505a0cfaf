//! The `studyspark review` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

use studyspark_core::scheduler::Outcome;

use super::open_service;

pub async fn execute(
    card: String,
    correct: bool,
    study_time_secs: Option<f64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let card_id: Uuid = card
        .trim()
        .parse()
        .with_context(|| format!("invalid card id '{card}'"))?;
    let outcome = Outcome::from(correct);

    let (_, service) = open_service(config_path).await?;
    let updated = service
        .record_outcome_retrying(card_id, outcome, study_time_secs)
        .await?;

    let stats = updated.stats();
    let schedule = updated.schedule();
    println!("Recorded {outcome} for {card_id}");
    println!(
        "  next review {} (interval {:.1} days, ease {:.2})",
        schedule.next_review_at().to_rfc3339(),
        schedule.interval_days(),
        schedule.ease_factor()
    );
    println!(
        "  mastery {}% ({}/{} correct, {} in a row)",
        stats.mastery_level(),
        stats.times_correct(),
        stats.times_studied(),
        schedule.consecutive_correct()
    );

    Ok(())
}
