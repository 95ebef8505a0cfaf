//! TOML deck parser.
//!
//! Loads flashcard decks from TOML files and directories, and validates them.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Difficulty, FlashcardRecord};

/// Longest question text accepted without a warning.
pub const MAX_QUESTION_LEN: usize = 1000;
/// Longest answer text accepted without a warning.
pub const MAX_ANSWER_LEN: usize = 2000;

/// A parsed deck of flashcard definitions.
#[derive(Debug, Clone)]
pub struct Deck {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Owner assigned to imported cards unless overridden.
    pub owner: Option<String>,
    pub cards: Vec<CardDefinition>,
}

/// Content of one card before it has any review state.
#[derive(Debug, Clone)]
pub struct CardDefinition {
    pub topic: String,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl Deck {
    /// Turn the definitions into new cards owned by `owner_id`, due at `now`.
    pub fn into_cards(self, owner_id: &str, now: DateTime<Utc>) -> Vec<FlashcardRecord> {
        self.cards
            .into_iter()
            .map(|def| {
                FlashcardRecord::new(owner_id, def.topic, def.question, def.answer, now)
                    .with_difficulty(def.difficulty)
                    .with_category(def.category)
                    .with_tags(def.tags)
            })
            .collect()
    }
}

/// Intermediate TOML structure for parsing deck files.
#[derive(Debug, Deserialize)]
struct TomlDeckFile {
    deck: TomlDeckHeader,
    #[serde(default)]
    cards: Vec<TomlCard>,
}

#[derive(Debug, Deserialize)]
struct TomlDeckHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default = "default_difficulty_str")]
    default_difficulty: String,
}

fn default_difficulty_str() -> String {
    "medium".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlCard {
    topic: String,
    question: String,
    answer: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Parse a single TOML file into a `Deck`.
pub fn parse_deck(path: &Path) -> Result<Deck> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read deck file: {}", path.display()))?;

    parse_deck_str(&content, path)
}

/// Parse a TOML string into a `Deck` (useful for testing).
pub fn parse_deck_str(content: &str, source_path: &Path) -> Result<Deck> {
    let parsed: TomlDeckFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_difficulty: Difficulty = parsed
        .deck
        .default_difficulty
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let cards = parsed
        .cards
        .into_iter()
        .map(|c| {
            let difficulty = c
                .difficulty
                .map(|d| d.parse().map_err(|e: String| anyhow::anyhow!("{}", e)))
                .transpose()?
                .unwrap_or(default_difficulty);

            Ok(CardDefinition {
                topic: c.topic.trim().to_string(),
                question: c.question.trim().to_string(),
                answer: c.answer.trim().to_string(),
                difficulty,
                category: c.category.map(|s| s.trim().to_string()),
                tags: c.tags.into_iter().map(|t| t.trim().to_string()).collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Deck {
        id: parsed.deck.id,
        name: parsed.deck.name,
        description: parsed.deck.description,
        owner: parsed.deck.owner,
        cards,
    })
}

/// Recursively load all `.toml` deck files from a directory.
pub fn load_deck_directory(dir: &Path) -> Result<Vec<Deck>> {
    let mut decks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            decks.extend(load_deck_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_deck(&path) {
                Ok(deck) => decks.push(deck),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(decks)
}

/// Load a single deck file, or every deck under a directory.
pub fn load_decks(path: &Path) -> Result<Vec<Deck>> {
    if path.is_dir() {
        load_deck_directory(path)
    } else {
        Ok(vec![parse_deck(path)?])
    }
}

/// A warning from deck validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// 1-based position of the card in the deck (if applicable).
    pub card_index: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Validate a deck for common issues.
pub fn validate_deck(deck: &Deck) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if deck.cards.is_empty() {
        warnings.push(ValidationWarning {
            card_index: None,
            message: "deck has no cards".into(),
        });
    }

    // Check for duplicate questions within a topic
    let mut seen = std::collections::HashSet::new();
    for (i, card) in deck.cards.iter().enumerate() {
        let key = (card.topic.to_lowercase(), card.question.to_lowercase());
        if !card.question.is_empty() && !seen.insert(key) {
            warnings.push(ValidationWarning {
                card_index: Some(i + 1),
                message: format!("duplicate question in topic '{}'", card.topic),
            });
        }
    }

    for (i, card) in deck.cards.iter().enumerate() {
        let index = Some(i + 1);
        if card.topic.is_empty() {
            warnings.push(ValidationWarning {
                card_index: index,
                message: "topic is empty".into(),
            });
        }
        if card.question.is_empty() {
            warnings.push(ValidationWarning {
                card_index: index,
                message: "question is empty".into(),
            });
        }
        if card.answer.is_empty() {
            warnings.push(ValidationWarning {
                card_index: index,
                message: "answer is empty".into(),
            });
        }
        let question_len = card.question.chars().count();
        if question_len > MAX_QUESTION_LEN {
            warnings.push(ValidationWarning {
                card_index: index,
                message: format!(
                    "question is {question_len} characters, longer than {MAX_QUESTION_LEN}"
                ),
            });
        }
        let answer_len = card.answer.chars().count();
        if answer_len > MAX_ANSWER_LEN {
            warnings.push(ValidationWarning {
                card_index: index,
                message: format!("answer is {answer_len} characters, longer than {MAX_ANSWER_LEN}"),
            });
        }
    }

    warnings
}
