//! Application configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use studyspark_core::traits::FlashcardStore;

use crate::json::JsonFileStore;
use crate::memory::InMemoryStore;

/// Where flashcards are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Nothing survives the process. Useful for tests and dry runs.
    Memory,
    Json {
        #[serde(default = "default_data_path")]
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Json {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./studyspark-data/cards.json")
}

/// Top-level studyspark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySparkConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Owner used when a command does not name one.
    #[serde(default = "default_owner")]
    pub default_owner: String,
    /// Cards returned by a due query when no limit is given.
    #[serde(default = "default_due_limit")]
    pub due_limit: usize,
    /// Max concurrent reviews in a batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Retries after a version conflict before giving up.
    #[serde(default = "default_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Output directory for analytics snapshots.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_owner() -> String {
    "local".to_string()
}
fn default_due_limit() -> usize {
    20
}
fn default_parallelism() -> usize {
    4
}
fn default_conflict_retries() -> u32 {
    3
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./studyspark-reports")
}

impl Default for StudySparkConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            default_owner: default_owner(),
            due_limit: default_due_limit(),
            parallelism: default_parallelism(),
            max_conflict_retries: default_conflict_retries(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `studyspark.toml` in the current directory
/// 2. `~/.config/studyspark/config.toml`
///
/// Environment variable overrides: `STUDYSPARK_DATA` (path of a JSON store),
/// `STUDYSPARK_OWNER`.
pub fn load_config() -> Result<StudySparkConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<StudySparkConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("studyspark.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<StudySparkConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => StudySparkConfig::default(),
    };

    if let Ok(data) = std::env::var("STUDYSPARK_DATA") {
        config.store = StoreConfig::Json {
            path: PathBuf::from(data),
        };
    }
    if let Ok(owner) = std::env::var("STUDYSPARK_OWNER") {
        config.default_owner = owner;
    }

    if let StoreConfig::Json { path } = &config.store {
        config.store = StoreConfig::Json {
            path: resolve_path(path),
        };
    }
    config.output_dir = resolve_path(&config.output_dir);
    config.default_owner = resolve_env_vars(&config.default_owner);

    if config.default_owner.trim().is_empty() {
        anyhow::bail!("default_owner must not be empty");
    }
    if config.parallelism == 0 {
        anyhow::bail!("parallelism must be at least 1");
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("studyspark"))
}

/// Create a store instance from its configuration.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn FlashcardStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreConfig::Json { path } => {
            let store = JsonFileStore::open(path)
                .await
                .with_context(|| format!("failed to open store at {}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}
