//! The `studyspark stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use studyspark_core::report::AnalyticsSnapshot;

use super::open_service;

pub async fn execute(
    owner: Option<String>,
    format: String,
    save: Option<Option<PathBuf>>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, service) = open_service(config_path).await?;
    let cards = match &owner {
        Some(owner_id) => service.store().list_by_owner(owner_id).await?,
        None => service.store().list_all().await?,
    };

    let now = service.clock().now();
    let snapshot = AnalyticsSnapshot::capture(&cards, owner.as_deref(), now);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        "text" => print_summary(&snapshot),
        other => anyhow::bail!("unknown format '{other}' (expected text or json)"),
    }

    if let Some(target) = save {
        let path = target.unwrap_or_else(|| {
            config
                .output_dir
                .join(format!("stats-{}.json", now.format("%Y-%m-%dT%H%M%S")))
        });
        snapshot.save_json(&path)?;
        eprintln!("Snapshot saved to: {}", path.display());
    }

    Ok(())
}

fn print_summary(snapshot: &AnalyticsSnapshot) {
    let summary = &snapshot.aggregate.summary;
    let scope = snapshot.owner_id.as_deref().unwrap_or("all owners");
    println!("Flashcards ({scope}): {}", summary.total_flashcards);
    println!(
        "Reviews: {} ({} correct, {} incorrect) over {} sessions",
        summary.total_studied, summary.total_correct, summary.total_incorrect, summary.total_study_sessions
    );
    println!(
        "Average mastery: {:.1}%, average study time: {:.1}s",
        summary.avg_mastery_level, summary.avg_study_time_secs
    );

    if !snapshot.aggregate.topics.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Topic", "Cards", "Sessions", "Mastery", "Avg Time"]);
        for t in &snapshot.aggregate.topics {
            table.add_row(vec![
                Cell::new(&t.topic),
                Cell::new(t.flashcard_count),
                Cell::new(t.total_study_sessions),
                Cell::new(format!("{:.1}%", t.avg_mastery_level)),
                Cell::new(format!("{:.1}s", t.avg_study_time_secs)),
            ]);
        }
        println!("\n{table}");
    }

    if !snapshot.aggregate.mastery.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Band", "Cards", "Avg Time"]);
        for b in &snapshot.aggregate.mastery {
            table.add_row(vec![
                Cell::new(b.band),
                Cell::new(b.count),
                Cell::new(format!("{:.1}s", b.avg_study_time_secs)),
            ]);
        }
        println!("\n{table}");
    }
}
