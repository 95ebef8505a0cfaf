//! JSON file store.
//!
//! The whole collection lives in one document:
//!
//! ```json
//! { "format_version": 1, "cards": [ ... ] }
//! ```
//!
//! Every mutation holds an exclusive lock on a sidecar `<file>.lock` while it
//! re-reads the document, applies the change, and rewrites it through a
//! temporary file in the same directory followed by a rename. Several
//! processes can therefore share one data file: compare-and-swap always runs
//! against the latest persisted versions. Reads take no lock; the rename
//! guarantees they never observe a torn file.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};

use studyspark_core::model::{CardId, FlashcardRecord};
use studyspark_core::traits::FlashcardStore;

use crate::error::StoreError;
use crate::memory::{all_sorted, compare_and_swap, insert_new, owned_by};

/// Current on-disk format.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Document {
    format_version: u32,
    #[serde(default)]
    cards: Vec<FlashcardRecord>,
}

type CardMap = HashMap<CardId, FlashcardRecord>;

/// A store persisted to a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store and is
    /// created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let store = Self { path };
        let cards = store.load().await?;
        for card in cards.values() {
            if let Err(e) = card.validate() {
                // Loaded anyway; the scheduler refuses to review it.
                tracing::warn!(card = %card.id, error = %e, "stored card has invalid review state");
            }
        }
        tracing::info!(path = %store.path.display(), cards = cards.len(), "opened json store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the sidecar file writers lock.
    pub fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.path)
    }

    async fn load(&self) -> anyhow::Result<CardMap> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => decode(&self.path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Io(e))
                .with_context(|| format!("failed to read {}", self.path.display())),
        }
    }

    /// Run `op` on the latest persisted cards under the writer lock and
    /// persist the result. Nothing is written if `op` fails.
    async fn transact<R, F>(&self, op: F) -> anyhow::Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut CardMap) -> anyhow::Result<R> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || transact_locked(&path, op))
            .await
            .context("store task panicked")?
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn decode(path: &Path, content: &str) -> anyhow::Result<CardMap> {
    let doc: Document = serde_json::from_str(content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    if doc.format_version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedFormat {
            path: path.to_path_buf(),
            found: doc.format_version,
            expected: FORMAT_VERSION,
        }
        .into());
    }

    let mut cards = HashMap::with_capacity(doc.cards.len());
    for card in doc.cards {
        insert_new(&mut cards, card)?;
    }
    Ok(cards)
}

fn read_locked(path: &Path) -> anyhow::Result<CardMap> {
    match std::fs::read_to_string(path) {
        Ok(content) => decode(path, &content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => {
            Err(StoreError::Io(e)).with_context(|| format!("failed to read {}", path.display()))
        }
    }
}

fn transact_locked<R>(
    path: &Path,
    op: impl FnOnce(&mut CardMap) -> anyhow::Result<R>,
) -> anyhow::Result<R> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let lock_path = lock_path_for(path);
    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(StoreError::Io)
        .with_context(|| format!("failed to open {}", lock_path.display()))?;
    let mut lock = RwLock::new(lock_file);
    let _guard = lock
        .write()
        .map_err(StoreError::Io)
        .with_context(|| format!("failed to lock {}", lock_path.display()))?;

    let mut cards = read_locked(path)?;
    let result = op(&mut cards)?;

    let doc = Document {
        format_version: FORMAT_VERSION,
        cards: all_sorted(&cards),
    };
    let bytes = serde_json::to_vec_pretty(&doc).context("failed to serialize cards")?;
    write_atomically(path, &dir, &bytes)?;
    Ok(result)
}

fn write_atomically(path: &Path, dir: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(StoreError::Io)?;
    tmp.write_all(bytes).map_err(StoreError::Io)?;
    tmp.as_file().sync_all().map_err(StoreError::Io)?;
    tmp.persist(path)
        .map_err(|e| StoreError::Io(e.error))
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "persisted cards");
    Ok(())
}

#[async_trait]
impl FlashcardStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn get(&self, id: CardId) -> anyhow::Result<Option<FlashcardRecord>> {
        Ok(self.load().await?.remove(&id))
    }

    async fn insert(&self, card: FlashcardRecord) -> anyhow::Result<()> {
        self.transact(move |cards| insert_new(cards, card)).await
    }

    async fn update(
        &self,
        card: &FlashcardRecord,
        expected_version: u64,
    ) -> anyhow::Result<FlashcardRecord> {
        let card = card.clone();
        self.transact(move |cards| compare_and_swap(cards, &card, expected_version))
            .await
    }

    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<FlashcardRecord>> {
        Ok(owned_by(&self.load().await?, owner_id))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<FlashcardRecord>> {
        Ok(all_sorted(&self.load().await?))
    }
}
