//! In-memory store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use studyspark_core::model::{CardId, FlashcardRecord};
use studyspark_core::traits::FlashcardStore;
use studyspark_core::StudyError;

use crate::error::StoreError;

/// A process-local store backed by a `HashMap`.
///
/// Updates take the write lock for the whole compare-and-swap, so two
/// writers holding the same version can never both succeed.
#[derive(Default)]
pub struct InMemoryStore {
    cards: RwLock<HashMap<CardId, FlashcardRecord>>,
    /// Number of successful updates.
    update_count: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `cards`.
    pub fn with_cards(cards: impl IntoIterator<Item = FlashcardRecord>) -> Self {
        Self {
            cards: RwLock::new(cards.into_iter().map(|c| (c.id, c)).collect()),
            update_count: AtomicU64::new(0),
        }
    }

    /// Get the number of successful updates applied to this store.
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.read().await.is_empty()
    }
}

/// Insert `card` unless its id is taken.
pub(crate) fn insert_new(
    cards: &mut HashMap<CardId, FlashcardRecord>,
    card: FlashcardRecord,
) -> anyhow::Result<()> {
    if cards.contains_key(&card.id) {
        return Err(StoreError::DuplicateId(card.id).into());
    }
    cards.insert(card.id, card);
    Ok(())
}

/// Replace the stored copy of `card` if its version is still `expected_version`.
pub(crate) fn compare_and_swap(
    cards: &mut HashMap<CardId, FlashcardRecord>,
    card: &FlashcardRecord,
    expected_version: u64,
) -> anyhow::Result<FlashcardRecord> {
    let stored = cards
        .get_mut(&card.id)
        .ok_or(StudyError::NotFound(card.id))?;
    if stored.version != expected_version {
        return Err(StudyError::ConcurrentModification {
            id: card.id,
            expected: expected_version,
            found: stored.version,
        }
        .into());
    }
    let mut next = card.clone();
    next.version = expected_version + 1;
    *stored = next.clone();
    Ok(next)
}

/// Cards of `owner_id` in a stable order.
pub(crate) fn owned_by(
    cards: &HashMap<CardId, FlashcardRecord>,
    owner_id: &str,
) -> Vec<FlashcardRecord> {
    let mut owned: Vec<FlashcardRecord> = cards
        .values()
        .filter(|c| c.owner_id == owner_id)
        .cloned()
        .collect();
    owned.sort_by_key(|c| (c.created_at, c.id));
    owned
}

pub(crate) fn all_sorted(cards: &HashMap<CardId, FlashcardRecord>) -> Vec<FlashcardRecord> {
    let mut all: Vec<FlashcardRecord> = cards.values().cloned().collect();
    all.sort_by_key(|c| (c.created_at, c.id));
    all
}

#[async_trait]
impl FlashcardStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, id: CardId) -> anyhow::Result<Option<FlashcardRecord>> {
        Ok(self.cards.read().await.get(&id).cloned())
    }

    async fn insert(&self, card: FlashcardRecord) -> anyhow::Result<()> {
        insert_new(&mut *self.cards.write().await, card)
    }

    async fn update(
        &self,
        card: &FlashcardRecord,
        expected_version: u64,
    ) -> anyhow::Result<FlashcardRecord> {
        let updated = compare_and_swap(&mut *self.cards.write().await, card, expected_version)?;
        self.update_count.fetch_add(1, Ordering::Relaxed);
        Ok(updated)
    }

    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<FlashcardRecord>> {
        Ok(owned_by(&*self.cards.read().await, owner_id))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<FlashcardRecord>> {
        Ok(all_sorted(&*self.cards.read().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use studyspark_core::scheduler::{record_outcome, Outcome};
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn card(n: u128, owner: &str) -> FlashcardRecord {
        FlashcardRecord::new(owner, "sql", format!("q{n}"), "a", t0()).with_id(Uuid::from_u128(n))
    }

    #[tokio::test]
    async fn insert_get_and_duplicate() {
        let store = InMemoryStore::new();
        store.insert(card(1, "alice")).await.unwrap();
        assert_eq!(store.get(Uuid::from_u128(1)).await.unwrap().unwrap().question, "q1");
        assert!(store.get(Uuid::from_u128(2)).await.unwrap().is_none());

        let err = store.insert(card(1, "alice")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let store = InMemoryStore::with_cards([card(1, "alice")]);
        let current = store.get(Uuid::from_u128(1)).await.unwrap().unwrap();
        let next = record_outcome(&current, Outcome::Correct, None, t0()).unwrap();

        let saved = store.update(&next, current.version).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.update_count(), 1);
        assert_eq!(store.get(next.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn stale_update_is_rejected_without_effect() {
        let store = InMemoryStore::with_cards([card(1, "alice")]);
        let current = store.get(Uuid::from_u128(1)).await.unwrap().unwrap();

        let first = record_outcome(&current, Outcome::Correct, None, t0()).unwrap();
        let second = record_outcome(&current, Outcome::Incorrect, None, t0()).unwrap();
        store.update(&first, current.version).await.unwrap();

        let err = store.update(&second, current.version).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<StudyError>(),
            Some(&StudyError::ConcurrentModification {
                id: current.id,
                expected: 0,
                found: 1
            })
        );
        let stored = store.get(current.id).await.unwrap().unwrap();
        assert_eq!(stored.stats().times_correct(), 1);
        assert_eq!(stored.stats().times_incorrect(), 0);
    }

    #[tokio::test]
    async fn update_of_missing_card_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.update(&card(9, "alice"), 0).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<StudyError>(),
            Some(&StudyError::NotFound(Uuid::from_u128(9)))
        );
    }

    #[tokio::test]
    async fn due_cards_default_impl() {
        let now = t0() + Duration::days(1);
        let store = InMemoryStore::with_cards([card(1, "alice"), card(2, "bob"), card(3, "alice")]);
        let due = store.due_cards("alice", now, 20).await.unwrap();
        let ids: Vec<u128> = due.iter().map(|c| c.id.as_u128()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
        assert_eq!(store.list_by_owner("bob").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_never_lose_increments() {
        let store = Arc::new(InMemoryStore::with_cards([card(1, "alice")]));
        let id = Uuid::from_u128(1);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut applied = 0u32;
                for _ in 0..25 {
                    loop {
                        let current = store.get(id).await.unwrap().unwrap();
                        let next = record_outcome(&current, Outcome::Correct, None, t0()).unwrap();
                        match store.update(&next, current.version).await {
                            Ok(_) => {
                                applied += 1;
                                break;
                            }
                            Err(e) => {
                                assert!(e.downcast_ref::<StudyError>().unwrap().is_retryable());
                            }
                        }
                    }
                }
                applied
            }));
        }

        let mut total = 0;
        for h in handles {
            total += h.await.unwrap();
        }
        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(total, 200);
        assert_eq!(stored.stats().times_studied(), 200);
        assert_eq!(stored.version, 200);
    }
}
