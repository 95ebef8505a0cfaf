//! The `studyspark import` command.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use studyspark_core::parser::{load_decks, validate_deck};

use super::open_service;

/// Import every card of the deck(s) at `deck_path`.
///
/// Cards flagged by validation are skipped; deck-level warnings are only
/// reported.
pub async fn execute(
    deck_path: PathBuf,
    owner: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let decks = load_decks(&deck_path)?;
    anyhow::ensure!(!decks.is_empty(), "no decks found in {}", deck_path.display());

    let (config, service) = open_service(config_path).await?;
    let store = service.store();
    let now = service.clock().now();

    let mut imported = 0usize;
    let mut skipped = 0usize;

    for deck in decks {
        let owner_id = owner
            .clone()
            .or_else(|| deck.owner.clone())
            .unwrap_or_else(|| config.default_owner.clone());
        anyhow::ensure!(!owner_id.trim().is_empty(), "owner must not be empty");

        let warnings = validate_deck(&deck);
        let rejected: HashSet<usize> = warnings.iter().filter_map(|w| w.card_index).collect();
        for w in &warnings {
            match w.card_index {
                Some(i) => eprintln!("  [{} card {i}] skipped: {}", deck.id, w.message),
                None => eprintln!("  [{}] WARNING: {}", deck.id, w.message),
            }
        }

        let deck_name = deck.name.clone();
        let mut count = 0usize;
        for (i, card) in deck.into_cards(&owner_id, now).into_iter().enumerate() {
            if rejected.contains(&(i + 1)) {
                skipped += 1;
                continue;
            }
            store
                .insert(card)
                .await
                .with_context(|| format!("failed to import card {} of {deck_name}", i + 1))?;
            count += 1;
        }

        tracing::info!(deck = %deck_name, owner = %owner_id, cards = count, "imported deck");
        println!("Imported {count} card(s) from {deck_name} for {owner_id}");
        imported += count;
    }

    if skipped > 0 {
        println!("{imported} card(s) imported, {skipped} skipped.");
    }

    Ok(())
}
