// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dual in-memory vector index: one snapshot per partition.
//!
//! Each partition publishes an immutable [`PartitionSnapshot`] through an
//! `ArcSwap`. Readers `load()` a snapshot and never block. Writers build a
//! modified copy and publish it with `rcu`. Keyword search lives in the
//! store's FTS5 table; the snapshot resolves its hits to items.

pub mod vector;

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use mimir_core::MimirError;
use tracing::debug;

use crate::types::{MemoryItem, Partition, SearchHit, SearchSource};

/// Immutable view of one partition.
#[derive(Debug, Clone, Default)]
pub struct PartitionSnapshot {
    items: HashMap<String, Arc<MemoryItem>>,
    dimensions: Option<usize>,
}

impl PartitionSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Embedding dimensionality fixed by the first insert, if any.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn get(&self, id: &str) -> Option<&Arc<MemoryItem>> {
        self.items.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<MemoryItem>> {
        self.items.values()
    }

    /// Cosine search. `session_id` limits results to items owned by that
    /// session or by no session.
    pub fn vector_search(
        &self,
        query: &[f32],
        min_similarity: f32,
        limit: usize,
        session_id: Option<&str>,
    ) -> Vec<SearchHit> {
        if self.dimensions.is_some_and(|d| d != query.len()) {
            debug!(
                expected = ?self.dimensions,
                actual = query.len(),
                "query embedding dimension differs from partition, skipping vector search"
            );
            return Vec::new();
        }
        let items = self
            .items
            .values()
            .filter(|item| session_visible(item, session_id));
        vector::search(items, query, min_similarity, limit)
            .into_iter()
            .map(|(id, raw_score)| SearchHit {
                id,
                raw_score,
                source: SearchSource::Vector,
            })
            .collect()
    }

    fn with_item(&self, item: Arc<MemoryItem>) -> Self {
        let mut next = self.clone();
        next.dimensions = next.dimensions.or(Some(item.embedding.len()));
        next.items.insert(item.id.clone(), item);
        next
    }
}

fn session_visible(item: &MemoryItem, session_id: Option<&str>) -> bool {
    match (session_id, item.session_id.as_deref()) {
        (Some(wanted), Some(owner)) => wanted == owner,
        _ => true,
    }
}

/// Lock-free index for a single partition.
pub struct PartitionIndex {
    partition: Partition,
    snapshot: ArcSwap<PartitionSnapshot>,
}

impl PartitionIndex {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            snapshot: ArcSwap::from_pointee(PartitionSnapshot::default()),
        }
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Current snapshot. Cheap; never blocks.
    pub fn load(&self) -> Arc<PartitionSnapshot> {
        self.snapshot.load_full()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail if `actual` conflicts with the partition's fixed dimensionality.
    pub fn check_dimensions(&self, actual: usize) -> Result<(), MimirError> {
        match self.snapshot.load().dimensions {
            Some(expected) if expected != actual => Err(MimirError::DimensionMismatch {
                partition: self.partition.to_string(),
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Add or replace an item.
    pub fn insert(&self, item: MemoryItem) -> Result<(), MimirError> {
        if item.partition != self.partition {
            return Err(MimirError::Internal(format!(
                "item {} belongs to the {} partition, not {}",
                item.id, item.partition, self.partition
            )));
        }
        self.check_dimensions(item.embedding.len())?;
        let item = Arc::new(item);
        self.snapshot.rcu(|current| current.with_item(Arc::clone(&item)));
        Ok(())
    }

    /// Remove items by id. Returns how many were present.
    pub fn remove(&self, ids: &[String]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut removed = 0;
        self.snapshot.rcu(|current| {
            let mut next = PartitionSnapshot::clone(current);
            removed = 0;
            for id in ids {
                if next.items.remove(id).is_some() {
                    removed += 1;
                }
            }
            next
        });
        removed
    }

    /// Apply `update` to an item in place (content is not re-indexed).
    /// Returns false if the id is absent.
    pub fn update(&self, id: &str, update: impl Fn(&mut MemoryItem)) -> bool {
        let mut found = false;
        self.snapshot.rcu(|current| {
            found = false;
            let mut next = PartitionSnapshot::clone(current);
            if let Some(existing) = next.items.get_mut(id) {
                let mut item = MemoryItem::clone(existing);
                update(&mut item);
                *existing = Arc::new(item);
                found = true;
            }
            next
        });
        found
    }

    /// Replace the whole partition, e.g. after a reindex from the store.
    ///
    /// Items whose dimensionality differs from the first item are rejected.
    pub fn replace_all(&self, items: Vec<MemoryItem>) -> Result<usize, MimirError> {
        let mut next = PartitionSnapshot::default();
        for item in items {
            if let Some(expected) = next.dimensions
                && expected != item.embedding.len()
            {
                return Err(MimirError::DimensionMismatch {
                    partition: self.partition.to_string(),
                    expected,
                    actual: item.embedding.len(),
                });
            }
            next = next.with_item(Arc::new(item));
        }
        let count = next.len();
        self.snapshot.store(Arc::new(next));
        Ok(count)
    }
}

/// Knowledge and episodic indexes side by side.
pub struct DualIndex {
    knowledge: PartitionIndex,
    episodic: PartitionIndex,
}

impl DualIndex {
    pub fn new() -> Self {
        Self {
            knowledge: PartitionIndex::new(Partition::Knowledge),
            episodic: PartitionIndex::new(Partition::Episodic),
        }
    }

    pub fn partition(&self, partition: Partition) -> &PartitionIndex {
        match partition {
            Partition::Knowledge => &self.knowledge,
            Partition::Episodic => &self.episodic,
        }
    }
}

impl Default for DualIndex {
    fn default() -> Self {
        Self::new()
    }
}
