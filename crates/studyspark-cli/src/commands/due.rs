//! The `studyspark due` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use studyspark_core::model::FlashcardRecord;

use super::{open_service, truncate};

pub async fn execute(
    owner: Option<String>,
    limit: Option<usize>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(limit != Some(0), "limit must be at least 1");

    let (config, service) = open_service(config_path).await?;
    let owner_id = owner.unwrap_or(config.default_owner);

    let due = service.select_due_cards(&owner_id, limit).await?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&due)?),
        "text" => {
            if due.is_empty() {
                println!("No cards due for {owner_id}.");
            } else {
                println!("{}", due_table(&due));
                println!("{} card(s) due for {owner_id}.", due.len());
            }
        }
        other => anyhow::bail!("unknown format '{other}' (expected text or json)"),
    }

    Ok(())
}

fn due_table(cards: &[FlashcardRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Id",
        "Topic",
        "Question",
        "Due",
        "Interval",
        "Ease",
        "Mastery",
    ]);

    for card in cards {
        let schedule = card.schedule();
        table.add_row(vec![
            Cell::new(card.id),
            Cell::new(&card.topic),
            Cell::new(truncate(&card.question, 48)),
            Cell::new(schedule.next_review_at().format("%Y-%m-%d %H:%M")),
            Cell::new(format!("{:.1}d", schedule.interval_days())),
            Cell::new(format!("{:.2}", schedule.ease_factor())),
            Cell::new(format!("{}%", card.stats().mastery_level())),
        ]);
    }
    table
}
