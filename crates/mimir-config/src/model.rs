// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mimir memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Mimir configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MimirConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Metadata store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Indexing, search, fusion and deduplication settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Relevance threshold, top-K and token budget.
    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Post-conversation fact extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Scheduled pruning settings.
    #[serde(default)]
    pub pruning: PruningConfig,

    /// Query router settings.
    #[serde(default)]
    pub router: RouterConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("mimir").join("mimir.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("mimir.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Memory indexing and hybrid search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Maximum stored content length in characters; longer text is truncated
    /// before embedding.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Minimum cosine similarity for a vector-search candidate (0.0-1.0).
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,

    /// Maximum candidates per search method and partition (pre-fusion).
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Reciprocal Rank Fusion damping constant.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,

    /// Temporal decay half-life for the episodic partition, in days.
    /// `None` disables decay.
    #[serde(default = "default_episodic_half_life_days")]
    pub episodic_half_life_days: Option<f64>,

    /// Temporal decay half-life for the knowledge partition, in days.
    #[serde(default)]
    pub knowledge_half_life_days: Option<f64>,

    /// Weight of temporal decay in the final score (0.0 = none, 1.0 = pure
    /// exponential half-life decay). Values below 1.0 put a floor under it.
    #[serde(default = "default_decay_weight")]
    pub decay_weight: f64,

    /// MMR trade-off between relevance (1.0) and diversity (0.0).
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f64,

    /// Cosine similarity at or above which two facts are duplicates.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,

    /// Word-overlap (Jaccard) similarity at or above which two facts are duplicates.
    #[serde(default = "default_lexical_duplicate_threshold")]
    pub lexical_duplicate_threshold: f64,

    /// Search deadline in milliseconds. On expiry the search degrades
    /// to whatever it has gathered.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_content_chars: default_max_content_chars(),
            min_similarity: default_min_similarity(),
            candidate_limit: default_candidate_limit(),
            rrf_k: default_rrf_k(),
            episodic_half_life_days: default_episodic_half_life_days(),
            knowledge_half_life_days: None,
            decay_weight: default_decay_weight(),
            mmr_lambda: default_mmr_lambda(),
            duplicate_threshold: default_duplicate_threshold(),
            lexical_duplicate_threshold: default_lexical_duplicate_threshold(),
            search_timeout_ms: default_search_timeout_ms(),
        }
    }
}

fn default_max_content_chars() -> usize {
    2000
}

fn default_min_similarity() -> f64 {
    0.35
}

fn default_candidate_limit() -> usize {
    20
}

fn default_rrf_k() -> f64 {
    60.0
}

fn default_episodic_half_life_days() -> Option<f64> {
    Some(14.0)
}

fn default_decay_weight() -> f64 {
    1.0
}

fn default_mmr_lambda() -> f64 {
    0.7
}

fn default_duplicate_threshold() -> f64 {
    0.85
}

fn default_lexical_duplicate_threshold() -> f64 {
    0.9
}

fn default_search_timeout_ms() -> u64 {
    2000
}

/// Reranker and token guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RerankerConfig {
    /// Minimum fused score for a result to be kept (0.0-1.0).
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Maximum number of results returned.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Hard cumulative token budget for returned results.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Tokens-per-word multiplier used for cheap token estimation.
    #[serde(default = "default_token_multiplier")]
    pub token_multiplier: f64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            top_k: default_top_k(),
            max_tokens: default_max_tokens(),
            token_multiplier: default_token_multiplier(),
        }
    }
}

fn default_min_score() -> f64 {
    0.6
}

fn default_top_k() -> usize {
    3
}

fn default_max_tokens() -> usize {
    500
}

fn default_token_multiplier() -> f64 {
    1.3
}

/// Post-conversation fact extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Enable extraction on session end. When false, `on_session_end` is a no-op.
    #[serde(default = "default_extraction_enabled")]
    pub enabled: bool,

    /// Model to request from the LLM capability.
    #[serde(default = "default_extraction_model")]
    pub model: String,

    /// Number of most recent transcript turns sent for extraction.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Per-turn character cap in the extraction transcript.
    #[serde(default = "default_max_turn_chars")]
    pub max_turn_chars: usize,

    /// Maximum tokens the extraction completion may generate.
    #[serde(default = "default_extraction_max_tokens")]
    pub max_tokens: u32,

    /// Seconds before an extraction call is abandoned.
    #[serde(default = "default_extraction_timeout_secs")]
    pub timeout_secs: u64,

    /// Confidence assigned to extracted facts that omit one.
    #[serde(default = "default_extraction_confidence")]
    pub default_confidence: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: default_extraction_enabled(),
            model: default_extraction_model(),
            max_turns: default_max_turns(),
            max_turn_chars: default_max_turn_chars(),
            max_tokens: default_extraction_max_tokens(),
            timeout_secs: default_extraction_timeout_secs(),
            default_confidence: default_extraction_confidence(),
        }
    }
}

fn default_extraction_enabled() -> bool {
    true
}

fn default_extraction_model() -> String {
    "claude-haiku-4-5-20250901".to_string()
}

fn default_max_turns() -> usize {
    20
}

fn default_max_turn_chars() -> usize {
    500
}

fn default_extraction_max_tokens() -> u32 {
    1024
}

fn default_extraction_timeout_secs() -> u64 {
    30
}

fn default_extraction_confidence() -> f64 {
    0.6
}

/// Scheduled pruning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PruningConfig {
    /// Facts older than this many days (by creation time) are deleted.
    #[serde(default = "default_max_age_days")]
    pub max_fact_age_days: u32,

    /// Transcript messages older than this many days are deleted.
    #[serde(default = "default_max_age_days")]
    pub max_message_age_days: u32,

    /// Rows deleted per transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Merge near-duplicate facts during `prune_all`.
    #[serde(default = "default_merge_duplicates")]
    pub merge_duplicates: bool,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            max_fact_age_days: default_max_age_days(),
            max_message_age_days: default_max_age_days(),
            batch_size: default_batch_size(),
            merge_duplicates: default_merge_duplicates(),
        }
    }
}

fn default_max_age_days() -> u32 {
    30
}

fn default_batch_size() -> usize {
    500
}

fn default_merge_duplicates() -> bool {
    true
}

/// Query router configuration.
///
/// The built-in multilingual marker tables are always active; these lists
/// extend them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Additional phrases that indicate recall of past conversation.
    #[serde(default)]
    pub extra_episodic_markers: Vec<String>,

    /// Additional phrases that indicate a general-knowledge question.
    #[serde(default)]
    pub extra_knowledge_markers: Vec<String>,
}
