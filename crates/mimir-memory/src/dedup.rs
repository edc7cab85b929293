// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-time near-duplicate suppression.
//!
//! A candidate is a duplicate of an existing item in the same partition when
//! their categories overlap and either the embedding cosine reaches the
//! semantic threshold or the word-overlap Jaccard reaches the lexical one.
//! The check and the insert run under one per-partition mutex, so two
//! concurrent writers of the same fact cannot both succeed.

use std::sync::Arc;

use mimir_config::model::MemoryConfig;
use mimir_core::MimirError;
use mimir_storage::timestamp;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::index::{DualIndex, PartitionSnapshot};
use crate::store::MemoryStore;
use crate::types::{MemoryItem, Partition, RememberOutcome, cosine_similarity, jaccard_similarity};

/// Similarity thresholds for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicatePolicy {
    pub semantic_threshold: f32,
    pub lexical_threshold: f32,
}

impl DuplicatePolicy {
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            semantic_threshold: config.duplicate_threshold as f32,
            lexical_threshold: config.lexical_duplicate_threshold as f32,
        }
    }

    /// Whether `a` and `b` would violate the no-duplicates invariant.
    pub fn is_duplicate(&self, a: &MemoryItem, b: &MemoryItem) -> bool {
        if a.partition != b.partition || !categories_overlap(a.partition, &a.category, &b.category) {
            return false;
        }
        let semantic = !a.embedding.is_empty()
            && a.embedding.len() == b.embedding.len()
            && cosine_similarity(&a.embedding, &b.embedding) >= self.semantic_threshold;
        semantic || jaccard_similarity(&a.content, &b.content) >= self.lexical_threshold
    }

    /// First existing item in `snapshot` that `candidate` duplicates,
    /// preferring the earliest-created one.
    pub fn find_duplicate(
        &self,
        snapshot: &PartitionSnapshot,
        candidate: &MemoryItem,
    ) -> Option<Arc<MemoryItem>> {
        snapshot
            .items()
            .filter(|existing| existing.id != candidate.id && self.is_duplicate(candidate, existing))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned()
    }
}

/// Episodic categories must match exactly. Knowledge categories are
/// free-form: case-insensitive equality, or either side empty.
pub fn categories_overlap(partition: Partition, a: &str, b: &str) -> bool {
    match partition {
        Partition::Episodic => a.eq_ignore_ascii_case(b),
        Partition::Knowledge => {
            let (a, b) = (a.trim(), b.trim());
            a.is_empty() || b.is_empty() || a.to_lowercase() == b.to_lowercase()
        }
    }
}

/// Serialises check+insert per partition.
pub struct Deduplicator {
    index: Arc<DualIndex>,
    store: Arc<MemoryStore>,
    policy: DuplicatePolicy,
    knowledge_lock: Mutex<()>,
    episodic_lock: Mutex<()>,
}

impl Deduplicator {
    pub fn new(index: Arc<DualIndex>, store: Arc<MemoryStore>, policy: DuplicatePolicy) -> Self {
        Self {
            index,
            store,
            policy,
            knowledge_lock: Mutex::new(()),
            episodic_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &DuplicatePolicy {
        &self.policy
    }

    /// Acquire the write lock for a partition. Held by every mutation that
    /// must not interleave with a duplicate check.
    pub async fn lock(&self, partition: Partition) -> MutexGuard<'_, ()> {
        match partition {
            Partition::Knowledge => self.knowledge_lock.lock().await,
            Partition::Episodic => self.episodic_lock.lock().await,
        }
    }

    /// Persist and index `item` unless it duplicates an existing item, in
    /// which case the existing item is reinforced instead.
    ///
    /// A matched item whose row is already gone is dropped from the index
    /// and the check repeats, so a fact is never rejected against a memory
    /// that no longer exists.
    pub async fn insert_if_new(&self, item: MemoryItem) -> Result<RememberOutcome, MimirError> {
        let partition = item.partition;
        let _guard = self.lock(partition).await;
        let index = self.index.partition(partition);

        while let Some(existing) = self.policy.find_duplicate(&index.load(), &item) {
            let confidence = existing.confidence.max(item.confidence);
            let now = timestamp::now();
            if self.store.reinforce(&existing.id, confidence, &now).await? == 0 {
                debug!(%partition, stale_id = %existing.id, "matched item no longer stored, dropping it from the index");
                index.remove(std::slice::from_ref(&existing.id));
                continue;
            }
            index.update(&existing.id, |m| {
                m.confidence = m.confidence.max(confidence);
                m.last_accessed_at = now.clone();
            });
            debug!(%partition, existing_id = %existing.id, "duplicate rejected, existing item reinforced");
            return Ok(RememberOutcome::Duplicate {
                existing_id: existing.id.clone(),
            });
        }

        index.check_dimensions(item.embedding.len())?;
        self.store.insert(&item).await?;
        let id = item.id.clone();
        index.insert(item)?;
        debug!(%partition, %id, "memory inserted");
        Ok(RememberOutcome::Inserted { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_storage::Database;

    fn item(id: &str, partition: Partition, content: &str, category: &str, embedding: Vec<f32>) -> MemoryItem {
        MemoryItem {
            id: id.to_string(),
            partition,
            content: content.to_string(),
            embedding,
            category: category.to_string(),
            confidence: 0.6,
            session_id: None,
            created_at: timestamp::now(),
            last_accessed_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    async fn setup() -> (Deduplicator, Arc<DualIndex>, Arc<MemoryStore>) {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let store = Arc::new(MemoryStore::new(db));
        let index = Arc::new(DualIndex::new());
        let policy = DuplicatePolicy {
            semantic_threshold: 0.85,
            lexical_threshold: 0.9,
        };
        (
            Deduplicator::new(Arc::clone(&index), Arc::clone(&store), policy),
            index,
            store,
        )
    }

    #[test]
    fn category_overlap_rules() {
        assert!(categories_overlap(Partition::Episodic, "preference", "Preference"));
        assert!(!categories_overlap(Partition::Episodic, "preference", "habit"));
        assert!(categories_overlap(Partition::Knowledge, "", "rust"));
        assert!(categories_overlap(Partition::Knowledge, "Rust", "rust "));
        assert!(!categories_overlap(Partition::Knowledge, "rust", "go"));
    }

    #[test]
    fn duplicate_needs_similarity_and_category() {
        let policy = DuplicatePolicy {
            semantic_threshold: 0.85,
            lexical_threshold: 0.9,
        };
        let a = item("a", Partition::Episodic, "User prefers dark mode", "preference", vec![1.0, 0.0]);
        let near = item("b", Partition::Episodic, "Dark themes are preferred", "preference", vec![0.95, 0.31]);
        let other_cat = item("c", Partition::Episodic, "Dark themes are preferred", "habit", vec![0.95, 0.31]);
        let far = item("d", Partition::Episodic, "User owns a cat", "preference", vec![0.0, 1.0]);
        let same_words = item("e", Partition::Episodic, "user prefers DARK mode!", "preference", vec![0.0, 1.0]);

        assert!(policy.is_duplicate(&a, &near));
        assert!(!policy.is_duplicate(&a, &other_cat));
        assert!(!policy.is_duplicate(&a, &far));
        assert!(policy.is_duplicate(&a, &same_words));
    }

    #[tokio::test]
    async fn second_similar_fact_is_rejected_and_reinforces() {
        let (dedup, index, store) = setup().await;

        let first = item("first", Partition::Episodic, "User prefers dark mode", "preference", vec![1.0, 0.0]);
        let outcome = dedup.insert_if_new(first).await.unwrap();
        assert_eq!(outcome, RememberOutcome::Inserted { id: "first".into() });

        let mut second = item("second", Partition::Episodic, "User likes dark mode", "preference", vec![0.95, 0.3122]);
        second.confidence = 0.9;
        let outcome = dedup.insert_if_new(second).await.unwrap();
        assert_eq!(outcome, RememberOutcome::Duplicate { existing_id: "first".into() });

        assert_eq!(store.count(Partition::Episodic).await.unwrap(), 1);
        let stored = store.get_by_id("first").await.unwrap().unwrap();
        assert_eq!(stored.confidence, 0.9);
        assert_ne!(stored.last_accessed_at, "2026-01-01T00:00:00.000Z");
        assert_eq!(index.partition(Partition::Episodic).load().get("first").unwrap().confidence, 0.9);
    }

    #[tokio::test]
    async fn duplicate_of_deleted_row_is_inserted() {
        let (dedup, index, store) = setup().await;

        let ghost = item("ghost", Partition::Episodic, "User prefers dark mode", "preference", vec![1.0, 0.0]);
        index.partition(Partition::Episodic).insert(ghost).unwrap();

        let fresh = item("fresh", Partition::Episodic, "User prefers dark mode", "preference", vec![1.0, 0.0]);
        let outcome = dedup.insert_if_new(fresh).await.unwrap();

        assert_eq!(outcome, RememberOutcome::Inserted { id: "fresh".into() });
        assert!(store.get_by_id("fresh").await.unwrap().is_some());
        let snap = index.partition(Partition::Episodic).load();
        assert!(snap.get("ghost").is_none());
        assert_eq!(snap.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_fact_yield_one_row() {
        let (dedup, index, store) = setup().await;
        let dedup = Arc::new(dedup);

        let mut handles = Vec::new();
        for i in 0..16 {
            let dedup = Arc::clone(&dedup);
            handles.push(tokio::spawn(async move {
                let fact = item(&format!("id-{i}"), Partition::Episodic, "User prefers dark mode", "preference", vec![1.0, 0.0]);
                dedup.insert_if_new(fact).await.unwrap()
            }));
        }
        let mut inserted = 0;
        for h in handles {
            if h.await.unwrap().is_inserted() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.count(Partition::Episodic).await.unwrap(), 1);
        assert_eq!(index.partition(Partition::Episodic).len(), 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_reported_before_write() {
        let (dedup, _index, store) = setup().await;
        dedup
            .insert_if_new(item("a", Partition::Knowledge, "alpha", "", vec![1.0, 0.0]))
            .await
            .unwrap();
        let err = dedup
            .insert_if_new(item("b", Partition::Knowledge, "beta", "", vec![0.0, 1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, MimirError::DimensionMismatch { .. }));
        assert_eq!(store.count(Partition::Knowledge).await.unwrap(), 1);
    }
}
