// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid retriever combining vector similarity and BM25 via RRF fusion.
//!
//! The retriever embeds the query once while the FTS5 keyword queries run,
//! searches every routed partition, fuses each partition's lists with
//! Reciprocal Rank Fusion, normalises against the best possible fused
//! score, applies temporal decay and finally orders the candidates with
//! MMR. Everything runs against one search deadline: if the embedding call
//! fails or misses it the query runs keyword-only, and a keyword query that
//! misses it contributes nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mimir_config::model::MemoryConfig;
use mimir_core::MimirError;
use mimir_core::traits::EmbeddingAdapter;
use mimir_core::types::EmbeddingInput;
use mimir_storage::timestamp;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::fusion::{decay_factor, mmr_rerank, normalize_scores, reciprocal_rank_fusion};
use crate::index::DualIndex;
use crate::store::MemoryStore;
use crate::types::{Partition, ScoredMemory, SearchHit};

/// Embed a single text, checking the adapter returned a vector.
pub async fn embed_text(embedder: &dyn EmbeddingAdapter, text: &str) -> Result<Vec<f32>, MimirError> {
    let output = embedder
        .embed(EmbeddingInput {
            texts: vec![text.to_string()],
        })
        .await?;
    output
        .embeddings
        .into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MimirError::Embedding {
            message: "embedding adapter returned no vector".to_string(),
        })
}

/// Candidate generator for `search_memory`.
pub struct HybridRetriever {
    index: Arc<DualIndex>,
    store: Arc<MemoryStore>,
    embedder: Arc<dyn EmbeddingAdapter>,
    config: MemoryConfig,
}

impl HybridRetriever {
    pub fn new(
        index: Arc<DualIndex>,
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            index,
            store,
            embedder,
            config,
        }
    }

    /// Search budget used when the caller does not supply one.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.config.search_timeout_ms)
    }

    /// Embed the query before `deadline`. `None` means keyword-only.
    async fn embed_query(&self, query: &str, deadline: Instant, timeout: Duration) -> Option<Vec<f32>> {
        match tokio::time::timeout_at(deadline, embed_text(self.embedder.as_ref(), query)).await {
            Ok(Ok(embedding)) => Some(embedding),
            Ok(Err(e)) => {
                warn!(error = %e, "query embedding failed, falling back to keyword search");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "query embedding timed out, falling back to keyword search"
                );
                None
            }
        }
    }

    /// FTS5 candidates for one partition, empty on error or deadline.
    async fn keyword_hits(
        &self,
        partition: Partition,
        query: &str,
        session_id: Option<&str>,
        deadline: Instant,
    ) -> Vec<SearchHit> {
        let search = self
            .store
            .keyword_search(partition, query, self.config.candidate_limit, session_id);
        match tokio::time::timeout_at(deadline, search).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(%partition, error = %e, "keyword search failed");
                Vec::new()
            }
            Err(_) => {
                warn!(%partition, "keyword search missed the search deadline");
                Vec::new()
            }
        }
    }

    fn half_life(&self, partition: Partition) -> Option<f64> {
        match partition {
            Partition::Episodic => self.config.episodic_half_life_days,
            Partition::Knowledge => self.config.knowledge_half_life_days,
        }
    }

    /// Ranked candidates across `partitions`, scores in [0, 1] before MMR.
    ///
    /// `session_id` scopes the episodic partition to that session's items
    /// plus items owned by no session. Whatever was gathered when `timeout`
    /// runs out is returned.
    pub async fn search(
        &self,
        query: &str,
        partitions: &[Partition],
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Vec<ScoredMemory> {
        if query.trim().is_empty() || partitions.is_empty() {
            return Vec::new();
        }

        let deadline = Instant::now() + timeout;
        let keyword = async {
            let mut lists = Vec::with_capacity(partitions.len());
            for &partition in partitions {
                lists.push(
                    self.keyword_hits(partition, query, scope(partition, session_id), deadline)
                        .await,
                );
            }
            lists
        };
        let (embedding, keyword_lists) =
            tokio::join!(self.embed_query(query, deadline, timeout), keyword);

        let limit = self.config.candidate_limit;
        let min_similarity = self.config.min_similarity as f32;
        let rrf_k = self.config.rrf_k as f32;

        let mut candidates: Vec<ScoredMemory> = Vec::new();
        for (&partition, keyword_hits) in partitions.iter().zip(&keyword_lists) {
            let snapshot = self.index.partition(partition).load();
            let vector_hits = match &embedding {
                Some(e) => snapshot.vector_search(e, min_similarity, limit, scope(partition, session_id)),
                None => Vec::new(),
            };
            let fused = reciprocal_rank_fusion(&[vector_hits.as_slice(), keyword_hits.as_slice()], rrf_k);

            debug!(
                %partition,
                vector = vector_hits.len(),
                keyword = keyword_hits.len(),
                fused = fused.len(),
                "partition searched"
            );

            candidates.extend(fused.into_iter().filter_map(|(id, score)| {
                snapshot
                    .get(&id)
                    .map(|item| ScoredMemory::new(Arc::clone(item), score))
            }));
        }

        let lists = if embedding.is_some() { 2 } else { 1 };
        normalize_scores(&mut candidates, lists, rrf_k);

        let now = Utc::now();
        for candidate in candidates.iter_mut() {
            let age = timestamp::age_days(&candidate.memory.last_accessed_at, now);
            candidate.score *= decay_factor(
                age,
                self.half_life(candidate.memory.partition),
                self.config.decay_weight,
            );
        }

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.memory.confidence.total_cmp(&a.memory.confidence))
        });

        mmr_rerank(candidates, self.config.mmr_lambda as f32)
    }
}

/// Session scoping applies to the episodic partition only.
fn scope(partition: Partition, session_id: Option<&str>) -> Option<&str> {
    match partition {
        Partition::Episodic => session_id,
        Partition::Knowledge => None,
    }
}
