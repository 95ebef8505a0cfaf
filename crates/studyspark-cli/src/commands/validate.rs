//! The `studyspark validate` command.

use std::path::PathBuf;

use anyhow::Result;

use studyspark_core::parser::{load_decks, validate_deck};

pub fn execute(deck_path: PathBuf) -> Result<()> {
    let decks = load_decks(&deck_path)?;
    anyhow::ensure!(!decks.is_empty(), "no decks found in {}", deck_path.display());

    let mut total_warnings = 0;

    for deck in &decks {
        println!("Deck: {} ({} cards)", deck.name, deck.cards.len());

        let warnings = validate_deck(deck);
        for w in &warnings {
            let prefix = w
                .card_index
                .map(|i| format!("  [card {i}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All decks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
