//! The `studyspark init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("studyspark.toml").exists() {
        println!("studyspark.toml already exists, skipping.");
    } else {
        std::fs::write("studyspark.toml", SAMPLE_CONFIG)?;
        println!("Created studyspark.toml");
    }

    std::fs::create_dir_all("decks")?;
    let example_path = Path::new("decks/example.toml");
    if example_path.exists() {
        println!("decks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_DECK)?;
        println!("Created decks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: studyspark validate --deck decks/example.toml");
    println!("  2. Run: studyspark import --deck decks/example.toml");
    println!("  3. Run: studyspark due");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# studyspark configuration

default_owner = "local"
due_limit = 20
parallelism = 4
max_conflict_retries = 3
output_dir = "./studyspark-reports"

[store]
type = "json"
path = "./studyspark-data/cards.json"
"#;

const EXAMPLE_DECK: &str = r#"[deck]
id = "example"
name = "Example Deck"
description = "A few database questions to get started"
default_difficulty = "medium"

[[cards]]
topic = "databases"
question = "What does ACID stand for?"
answer = "Atomicity, Consistency, Isolation, Durability"
tags = ["transactions"]

[[cards]]
topic = "databases"
question = "What is a foreign key?"
answer = "A column that references the primary key of another table"
difficulty = "easy"

[[cards]]
topic = "indexing"
question = "Why can a B-tree index speed up range queries?"
answer = "Keys are kept sorted, so a range is a contiguous scan of leaf pages"
difficulty = "hard"
category = "storage"
"#;
