// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory engine: the public read, write and maintenance API.
//!
//! Read path: route -> hybrid search -> fusion, decay, MMR -> rerank and
//! token guard. Write path: truncate -> embed -> deduplicate -> persist ->
//! index. Post-session extraction runs on a [`TaskTracker`] so shutdown can
//! wait for it.

use std::sync::Arc;
use std::time::Duration;

use mimir_config::model::{MemoryConfig, MimirConfig};
use mimir_core::MimirError;
use mimir_core::traits::{EmbeddingAdapter, ProviderAdapter};
use mimir_core::types::Message;
use mimir_router::{QueryRouter, RouteTarget};
use mimir_storage::queries::messages;
use mimir_storage::{Database, timestamp};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dedup::{Deduplicator, DuplicatePolicy};
use crate::extractor::EpisodicExtractor;
use crate::index::DualIndex;
use crate::pruner::MemoryPruner;
use crate::reranker::Reranker;
use crate::retriever::{HybridRetriever, embed_text};
use crate::store::MemoryStore;
use crate::types::{
    EpisodicCategory, MemoryItem, NewMemory, Partition, PruneReport, ReindexReport,
    RememberOutcome, ScoredMemory, truncate_chars,
};

/// Hybrid memory retrieval engine.
pub struct MemoryEngine {
    db: Arc<Database>,
    store: Arc<MemoryStore>,
    index: Arc<DualIndex>,
    embedder: Arc<dyn EmbeddingAdapter>,
    router: QueryRouter,
    retriever: HybridRetriever,
    reranker: Reranker,
    dedup: Arc<Deduplicator>,
    extractor: Option<EpisodicExtractor>,
    pruner: MemoryPruner,
    tracker: TaskTracker,
    memory_config: MemoryConfig,
    max_turns: usize,
}

impl MemoryEngine {
    /// Build an engine with empty indexes. Call [`Self::reindex`] to load
    /// existing items, or use [`Self::open`].
    ///
    /// Without a provider, or with extraction disabled, session-end
    /// extraction is a no-op.
    pub fn new(
        db: Arc<Database>,
        embedder: Arc<dyn EmbeddingAdapter>,
        provider: Option<Arc<dyn ProviderAdapter>>,
        config: &MimirConfig,
    ) -> Self {
        let store = Arc::new(MemoryStore::new(Arc::clone(&db)));
        let index = Arc::new(DualIndex::new());
        let dedup = Arc::new(Deduplicator::new(
            Arc::clone(&index),
            Arc::clone(&store),
            DuplicatePolicy::from_config(&config.memory),
        ));
        let extractor = provider
            .filter(|_| config.extraction.enabled)
            .map(|p| EpisodicExtractor::new(p, config.extraction.clone()));
        let pruner = MemoryPruner::new(
            Arc::clone(&db),
            Arc::clone(&store),
            Arc::clone(&index),
            Arc::clone(&dedup),
            config.pruning.clone(),
        );

        Self {
            retriever: HybridRetriever::new(
                Arc::clone(&index),
                Arc::clone(&store),
                Arc::clone(&embedder),
                config.memory.clone(),
            ),
            router: QueryRouter::from_config(&config.router),
            reranker: Reranker::from_config(&config.reranker),
            db,
            store,
            index,
            embedder,
            dedup,
            extractor,
            pruner,
            tracker: TaskTracker::new(),
            memory_config: config.memory.clone(),
            max_turns: config.extraction.max_turns,
        }
    }

    /// Build an engine and load both indexes from the store.
    pub async fn open(
        db: Arc<Database>,
        embedder: Arc<dyn EmbeddingAdapter>,
        provider: Option<Arc<dyn ProviderAdapter>>,
        config: &MimirConfig,
    ) -> Result<Self, MimirError> {
        let engine = Self::new(db, embedder, provider, config);
        let report = engine.reindex().await?;
        info!(
            knowledge = report.knowledge,
            episodic = report.episodic,
            "memory engine ready"
        );
        Ok(engine)
    }

    // --- Read path ---

    /// Ranked, budgeted memories for a query.
    ///
    /// `partition_override` skips the router. Embedding failure or timeout
    /// degrades to keyword-only results rather than failing. The search is
    /// bounded by `memory.search_timeout_ms`.
    pub async fn search_memory(
        &self,
        query: &str,
        session_id: Option<&str>,
        partition_override: Option<Partition>,
    ) -> Result<Vec<ScoredMemory>, MimirError> {
        let timeout = self.retriever.default_timeout();
        self.search_memory_with_timeout(query, session_id, partition_override, timeout)
            .await
    }

    /// [`Self::search_memory`] with a caller-supplied time budget. When it
    /// runs out, whatever was gathered so far is ranked and returned,
    /// possibly nothing.
    pub async fn search_memory_with_timeout(
        &self,
        query: &str,
        session_id: Option<&str>,
        partition_override: Option<Partition>,
        timeout: Duration,
    ) -> Result<Vec<ScoredMemory>, MimirError> {
        let partitions: &[Partition] = match partition_override {
            Some(Partition::Episodic) => &[Partition::Episodic],
            Some(Partition::Knowledge) => &[Partition::Knowledge],
            None => match self.router.route(query).target {
                RouteTarget::Episodic => &[Partition::Episodic],
                RouteTarget::Knowledge => &[Partition::Knowledge],
                RouteTarget::Hybrid => &Partition::ALL,
            },
        };

        let candidates = self
            .retriever
            .search(query, partitions, session_id, timeout)
            .await;
        let results = self.reranker.rank(query, candidates);
        debug!(
            partitions = ?partitions,
            returned = results.len(),
            "search complete"
        );

        if !results.is_empty() {
            self.spawn_touch(&results);
        }
        Ok(results)
    }

    /// Refresh `last_accessed_at` for returned items, best effort.
    fn spawn_touch(&self, results: &[ScoredMemory]) {
        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.index);
        let touched: Vec<(String, Partition)> = results
            .iter()
            .map(|r| (r.memory.id.clone(), r.memory.partition))
            .collect();
        self.tracker.spawn(async move {
            let now = timestamp::now();
            let ids = touched.iter().map(|(id, _)| id.clone()).collect();
            if let Err(e) = store.touch(ids, &now).await {
                warn!(error = %e, "failed to record memory access");
                return;
            }
            for (id, partition) in &touched {
                index
                    .partition(*partition)
                    .update(id, |m| m.last_accessed_at = now.clone());
            }
        });
    }

    // --- Write path ---

    /// Remember a fact. Episodic categories (preference, factual, habit,
    /// entity) go to the episodic partition; anything else to knowledge.
    ///
    /// Returns `false` when the fact duplicated an existing memory.
    pub async fn remember_fact(&self, content: &str, category: &str) -> Result<bool, MimirError> {
        let new = match EpisodicCategory::parse(category) {
            Some(cat) => NewMemory::episodic(content, cat, None),
            None => NewMemory::knowledge(content, category.trim()),
        };
        Ok(self.remember(new).await?.is_inserted())
    }

    /// Full write form: embed, deduplicate, persist, index.
    pub async fn remember(&self, new: NewMemory) -> Result<RememberOutcome, MimirError> {
        let content = truncate_chars(new.content.trim(), self.memory_config.max_content_chars).trim_end();
        if content.is_empty() {
            return Err(MimirError::InvalidInput("memory content is empty".to_string()));
        }
        let category = match new.partition {
            Partition::Episodic => EpisodicCategory::parse(&new.category)
                .ok_or_else(|| {
                    MimirError::InvalidInput(format!("unknown episodic category '{}'", new.category))
                })?
                .as_str()
                .to_string(),
            Partition::Knowledge => new.category.trim().to_string(),
        };

        let embedding = embed_text(self.embedder.as_ref(), content)
            .await
            .map_err(|e| match e {
                MimirError::Embedding { .. } => e,
                other => MimirError::Embedding {
                    message: other.to_string(),
                },
            })?;

        let now = timestamp::now();
        let item = MemoryItem {
            id: Uuid::new_v4().to_string(),
            partition: new.partition,
            content: content.to_string(),
            embedding,
            category,
            confidence: new.confidence.clamp(0.0, 1.0),
            session_id: match new.partition {
                Partition::Episodic => new.session_id,
                Partition::Knowledge => None,
            },
            created_at: now.clone(),
            last_accessed_at: now,
        };
        self.dedup.insert_if_new(item).await
    }

    /// Remove one memory from the store and the indexes.
    ///
    /// Returns whether a stored row existed. Stray index entries for the id
    /// are removed either way.
    pub async fn forget(&self, id: &str) -> Result<bool, MimirError> {
        let existing = self.store.get_by_id(id).await?;
        let ids = [id.to_string()];
        match existing {
            Some(item) => {
                let _guard = self.dedup.lock(item.partition).await;
                let deleted = self.store.delete(id).await?;
                self.index.partition(item.partition).remove(&ids);
                debug!(partition = %item.partition, %id, "memory forgotten");
                Ok(deleted)
            }
            None => {
                for partition in Partition::ALL {
                    self.index.partition(partition).remove(&ids);
                }
                Ok(false)
            }
        }
    }

    /// Rebuild both indexes from the store.
    pub async fn reindex(&self) -> Result<ReindexReport, MimirError> {
        let mut report = ReindexReport::default();
        for partition in Partition::ALL {
            let _guard = self.dedup.lock(partition).await;
            let items = self.store.load_partition(partition).await?;
            let count = self.index.partition(partition).replace_all(items)?;
            match partition {
                Partition::Knowledge => report.knowledge = count,
                Partition::Episodic => report.episodic = count,
            }
        }
        debug!(
            knowledge = report.knowledge,
            episodic = report.episodic,
            "indexes rebuilt"
        );
        Ok(report)
    }

    /// Number of indexed items in a partition.
    pub fn indexed_len(&self, partition: Partition) -> usize {
        self.index.partition(partition).len()
    }

    // --- Transcript ---

    /// Append a message to a session transcript. Messages are not indexed.
    pub async fn add_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<Message, MimirError> {
        messages::append_message(&self.db, session_id, role, content).await
    }

    /// Run extraction over a session's recent transcript and store the new
    /// facts. Returns how many facts were inserted (duplicates excluded).
    pub async fn extract_session(&self, session_id: &str) -> Result<usize, MimirError> {
        let Some(extractor) = &self.extractor else {
            debug!(%session_id, "extraction disabled, skipping");
            return Ok(0);
        };

        let transcript = messages::get_recent_messages(&self.db, session_id, self.max_turns).await?;
        if transcript.is_empty() {
            return Ok(0);
        }

        let facts = extractor.extract(&transcript).await;
        let mut inserted = 0;
        for fact in facts {
            let new = NewMemory::episodic(fact.content, fact.category, Some(session_id.to_string()))
                .with_confidence(fact.confidence);
            match self.remember(new).await {
                Ok(outcome) if outcome.is_inserted() => inserted += 1,
                Ok(_) => {}
                Err(e) => warn!(%session_id, error = %e, "failed to store extracted fact"),
            }
        }
        info!(%session_id, count = inserted, "session facts stored");
        Ok(inserted)
    }

    /// Fire-and-forget extraction for a finished session.
    ///
    /// The handle resolves to the number of facts stored; failures are
    /// logged and resolve to 0.
    pub fn on_session_end(self: &Arc<Self>, session_id: &str) -> JoinHandle<usize> {
        let engine = Arc::clone(self);
        let session_id = session_id.to_string();
        self.tracker.spawn(async move {
            match engine.extract_session(&session_id).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(%session_id, error = %e, "session extraction failed");
                    0
                }
            }
        })
    }

    // --- Maintenance ---

    /// Scheduled pruning pass with the configured ages.
    pub async fn prune_all(&self) -> Result<PruneReport, MimirError> {
        self.pruner.prune_all().await
    }

    pub async fn prune_old_facts(&self, max_age_days: u32) -> Result<usize, MimirError> {
        self.pruner.prune_old_facts(max_age_days).await
    }

    pub async fn prune_old_messages(&self, max_age_days: u32) -> Result<usize, MimirError> {
        self.pruner.prune_old_messages(max_age_days).await
    }

    pub async fn merge_duplicates(&self) -> Result<usize, MimirError> {
        self.pruner.merge_duplicates().await
    }

    /// Stop accepting background work and wait for in-flight jobs.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        info!("memory engine shut down");
    }
}
