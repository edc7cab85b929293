// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled age-based deletion and duplicate merge.
//!
//! Deletions go by `created_at` only, in per-partition batches. Each batch
//! runs its transaction and the matching index removal under the
//! partition's write lock, so it never interleaves with a duplicate check.
//! Every entry point is single-flight: a call made while another is running
//! fails fast with [`MimirError::Busy`].

use std::collections::HashSet;
use std::sync::Arc;

use mimir_config::model::PruningConfig;
use mimir_core::MimirError;
use mimir_storage::queries::messages;
use mimir_storage::{Database, timestamp};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::dedup::Deduplicator;
use crate::index::DualIndex;
use crate::store::MemoryStore;
use crate::types::{Partition, PruneReport};

pub struct MemoryPruner {
    db: Arc<Database>,
    store: Arc<MemoryStore>,
    index: Arc<DualIndex>,
    dedup: Arc<Deduplicator>,
    config: PruningConfig,
    running: Mutex<()>,
}

impl MemoryPruner {
    pub fn new(
        db: Arc<Database>,
        store: Arc<MemoryStore>,
        index: Arc<DualIndex>,
        dedup: Arc<Deduplicator>,
        config: PruningConfig,
    ) -> Self {
        Self {
            db,
            store,
            index,
            dedup,
            config,
            running: Mutex::new(()),
        }
    }

    fn begin(&self) -> Result<MutexGuard<'_, ()>, MimirError> {
        self.running
            .try_lock()
            .map_err(|_| MimirError::Busy("pruning already in progress".to_string()))
    }

    /// Delete facts created more than `max_age_days` ago.
    pub async fn prune_old_facts(&self, max_age_days: u32) -> Result<usize, MimirError> {
        let _guard = self.begin()?;
        self.delete_old_facts(max_age_days).await
    }

    /// Delete transcript messages created more than `max_age_days` ago.
    pub async fn prune_old_messages(&self, max_age_days: u32) -> Result<usize, MimirError> {
        let _guard = self.begin()?;
        self.delete_old_messages(max_age_days).await
    }

    /// Collapse duplicate pairs, keeping the earlier item.
    pub async fn merge_duplicates(&self) -> Result<usize, MimirError> {
        let _guard = self.begin()?;
        self.merge_all_partitions().await
    }

    /// Full pass with the configured ages.
    pub async fn prune_all(&self) -> Result<PruneReport, MimirError> {
        let _guard = self.begin()?;
        let facts = self.delete_old_facts(self.config.max_fact_age_days).await?;
        let messages = self.delete_old_messages(self.config.max_message_age_days).await?;
        let duplicates_merged = if self.config.merge_duplicates {
            self.merge_all_partitions().await?
        } else {
            0
        };

        let report = PruneReport {
            facts,
            messages,
            duplicates_merged,
        };
        info!(
            facts = report.facts,
            messages = report.messages,
            duplicates_merged = report.duplicates_merged,
            "prune pass complete"
        );
        Ok(report)
    }

    async fn delete_old_facts(&self, max_age_days: u32) -> Result<usize, MimirError> {
        let cutoff = timestamp::cutoff(max_age_days);
        let mut total = 0;
        for partition in Partition::ALL {
            total += self.delete_old_partition_facts(partition, &cutoff).await?;
        }
        debug!(count = total, %cutoff, "old facts pruned");
        Ok(total)
    }

    async fn delete_old_partition_facts(&self, partition: Partition, cutoff: &str) -> Result<usize, MimirError> {
        let batch_size = self.config.batch_size.max(1);
        let index = self.index.partition(partition);
        let mut total = 0;
        loop {
            let batch = {
                let _write = self.dedup.lock(partition).await;
                let batch = self
                    .store
                    .delete_created_before(partition, cutoff, batch_size)
                    .await?;
                let removed = index.remove(&batch);
                if removed != batch.len() {
                    debug!(
                        %partition,
                        deleted = batch.len(),
                        unindexed = batch.len() - removed,
                        "pruned rows were missing from the index"
                    );
                }
                batch
            };
            total += batch.len();
            if batch.len() < batch_size {
                break;
            }
            tokio::task::yield_now().await;
        }
        Ok(total)
    }

    async fn delete_old_messages(&self, max_age_days: u32) -> Result<usize, MimirError> {
        let cutoff = timestamp::cutoff(max_age_days);
        let count = messages::delete_messages_before(&self.db, &cutoff, self.config.batch_size).await?;
        debug!(count, %cutoff, "old messages pruned");
        Ok(count)
    }

    async fn merge_all_partitions(&self) -> Result<usize, MimirError> {
        let mut merged = 0;
        for partition in Partition::ALL {
            merged += self.merge_partition(partition).await?;
        }
        Ok(merged)
    }

    async fn merge_partition(&self, partition: Partition) -> Result<usize, MimirError> {
        let _write = self.dedup.lock(partition).await;
        let index = self.index.partition(partition);
        let snapshot = index.load();
        let policy = *self.dedup.policy();

        let mut items: Vec<_> = snapshot.items().cloned().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut dropped: HashSet<String> = HashSet::new();
        for (i, keeper) in items.iter().enumerate() {
            if dropped.contains(&keeper.id) {
                continue;
            }
            let mut confidence = keeper.confidence;
            let mut absorbed = Vec::new();
            for other in &items[i + 1..] {
                if !dropped.contains(&other.id) && policy.is_duplicate(keeper, other) {
                    confidence = confidence.max(other.confidence);
                    absorbed.push(other.id.clone());
                }
            }
            if absorbed.is_empty() {
                continue;
            }
            for drop_id in &absorbed {
                self.store.merge(&keeper.id, drop_id, confidence).await?;
            }
            index.remove(&absorbed);
            index.update(&keeper.id, |m| m.confidence = m.confidence.max(confidence));
            debug!(%partition, keeper = %keeper.id, merged = absorbed.len(), "duplicates merged");
            dropped.extend(absorbed);
        }
        Ok(dropped.len())
    }
}
