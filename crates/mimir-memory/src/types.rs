// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types and vector helpers.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Independent index partition a memory item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Reference knowledge, not tied to a conversation.
    Knowledge,
    /// Facts about the user mined from conversations.
    Episodic,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Knowledge, Partition::Episodic];

    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Knowledge => "knowledge",
            Partition::Episodic => "episodic",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "knowledge" => Some(Partition::Knowledge),
            "episodic" => Some(Partition::Episodic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed category set for episodic facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodicCategory {
    Preference,
    Factual,
    Habit,
    Entity,
}

impl EpisodicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodicCategory::Preference => "preference",
            EpisodicCategory::Factual => "factual",
            EpisodicCategory::Habit => "habit",
            EpisodicCategory::Entity => "entity",
        }
    }

    /// Case-insensitive parse; `None` for anything outside the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "preference" => Some(EpisodicCategory::Preference),
            "factual" => Some(EpisodicCategory::Factual),
            "habit" => Some(EpisodicCategory::Habit),
            "entity" => Some(EpisodicCategory::Entity),
            _ => None,
        }
    }
}

/// The atomic retrievable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// UUID v4, stable across updates.
    pub id: String,
    pub partition: Partition,
    pub content: String,
    /// Produced once at write time.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// One of the [`EpisodicCategory`] values for episodic items; free-form
    /// for knowledge.
    pub category: String,
    /// 0.0-1.0. Ranking influence only.
    pub confidence: f64,
    /// Owning conversation (episodic items only).
    pub session_id: Option<String>,
    /// Immutable. Drives pruning.
    pub created_at: String,
    /// Drives temporal decay.
    pub last_accessed_at: String,
}

/// Input for a write through the deduplicator.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub partition: Partition,
    pub content: String,
    pub category: String,
    pub confidence: f64,
    pub session_id: Option<String>,
}

impl NewMemory {
    /// A knowledge item with the given free-form category.
    pub fn knowledge(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            partition: Partition::Knowledge,
            content: content.into(),
            category: category.into(),
            confidence: 1.0,
            session_id: None,
        }
    }

    /// An episodic fact, optionally owned by a session.
    pub fn episodic(
        content: impl Into<String>,
        category: EpisodicCategory,
        session_id: Option<String>,
    ) -> Self {
        Self {
            partition: Partition::Episodic,
            content: content.into(),
            category: category.as_str().to_string(),
            confidence: 1.0,
            session_id,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Result of a deduplicated write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RememberOutcome {
    /// A new row was written and indexed.
    Inserted { id: String },
    /// An existing item matched; it was reinforced instead.
    Duplicate { existing_id: String },
}

impl RememberOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, RememberOutcome::Inserted { .. })
    }

    pub fn id(&self) -> &str {
        match self {
            RememberOutcome::Inserted { id } => id,
            RememberOutcome::Duplicate { existing_id } => existing_id,
        }
    }
}

/// Which retriever produced a raw hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchSource {
    Vector,
    Keyword,
}

/// A raw hit from one retriever, in rank order within its list.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub raw_score: f32,
    pub source: SearchSource,
}

/// A memory with a retrieval score.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    /// Shared with the index snapshot it was read from.
    pub memory: Arc<MemoryItem>,
    /// Fused, decayed and diversity-adjusted score.
    pub score: f32,
    /// Filled in by the token guard.
    pub estimated_tokens: usize,
}

impl ScoredMemory {
    pub fn new(memory: Arc<MemoryItem>, score: f32) -> Self {
        Self {
            memory,
            score,
            estimated_tokens: 0,
        }
    }
}

/// A fact mined from a transcript, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFact {
    pub content: String,
    pub category: EpisodicCategory,
    pub confidence: f64,
}

/// Counts from a pruning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub facts: usize,
    pub messages: usize,
    pub duplicates_merged: usize,
}

impl PruneReport {
    pub fn total(&self) -> usize {
        self.facts + self.messages + self.duplicates_merged
    }
}

impl From<PruneReport> for BTreeMap<String, usize> {
    fn from(report: PruneReport) -> Self {
        BTreeMap::from([
            ("facts".to_string(), report.facts),
            ("messages".to_string(), report.messages),
            ("duplicates_merged".to_string(), report.duplicates_merged),
        ])
    }
}

/// Item counts after rebuilding the indexes from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub knowledge: usize,
    pub episodic: usize,
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector. Trailing partial chunks are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity. Mismatched lengths or zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn normalized_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Word-overlap Jaccard similarity on lowercased alphanumeric words.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let wa = normalized_words(a);
    let wb = normalized_words(b);
    if wa.is_empty() && wb.is_empty() {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    intersection as f32 / union as f32
}

/// Token estimate: `ceil(word_count * multiplier)`.
pub fn estimate_tokens(text: &str, multiplier: f64) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * multiplier).ceil() as usize
}

/// Truncate to at most `max_chars` characters without splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
