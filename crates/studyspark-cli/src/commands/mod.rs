pub mod compare;
pub mod due;
pub mod import;
pub mod init;
pub mod review;
pub mod stats;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use studyspark_core::service::{ReviewService, ReviewServiceConfig};
use studyspark_core::traits::SystemClock;
use studyspark_store::{create_store, load_config_from, StudySparkConfig};

/// Load config and open the configured store behind a review service.
pub(crate) async fn open_service(
    config_path: Option<PathBuf>,
) -> Result<(StudySparkConfig, ReviewService)> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.store).await?;
    tracing::debug!(store = store.name(), "store ready");

    let service = ReviewService::new(
        store,
        Arc::new(SystemClock),
        ReviewServiceConfig {
            due_limit: config.due_limit,
            parallelism: config.parallelism,
            max_conflict_retries: config.max_conflict_retries,
        },
    );
    Ok((config, service))
}

/// Shorten `s` to at most `max` characters for table cells.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
