// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid memory retrieval for conversational agents.
//!
//! Memories live in two partitions: **knowledge** (general facts) and
//! **episodic** (facts about the user). Each partition has an in-memory
//! vector index, published as immutable snapshots so searches never block
//! on writes, and a BM25 keyword index in SQLite FTS5 over the same items.
//!
//! ## Architecture
//!
//! - **MemoryEngine**: public API (`search_memory`, `remember_fact`,
//!   `add_message`, `on_session_end`, pruning)
//! - **DualIndex**: per-partition snapshot of items and vectors
//! - **HybridRetriever**: vector + BM25 search, RRF fusion, decay, MMR
//! - **Reranker**: relevance threshold, top-K and token budget
//! - **Deduplicator**: serialised near-duplicate check and insert
//! - **EpisodicExtractor**: LLM fact mining from finished conversations
//! - **MemoryPruner**: age-based deletion and duplicate merge
//! - **MemoryStore**: SQLite persistence and FTS5 keyword search

pub mod dedup;
pub mod engine;
pub mod extractor;
pub mod fts;
pub mod fusion;
pub mod index;
pub mod pruner;
pub mod reranker;
pub mod retriever;
pub mod store;
pub mod types;

pub use dedup::{Deduplicator, DuplicatePolicy};
pub use engine::MemoryEngine;
pub use extractor::EpisodicExtractor;
pub use index::{DualIndex, PartitionIndex, PartitionSnapshot};
pub use pruner::MemoryPruner;
pub use reranker::Reranker;
pub use retriever::HybridRetriever;
pub use store::MemoryStore;
pub use types::*;
