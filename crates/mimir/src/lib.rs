// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mimir - hybrid memory retrieval for conversational agents.
//!
//! Decides which stored memories, and in what order, are worth injecting
//! into an LLM prompt: query routing, vector + BM25 search, rank fusion,
//! temporal decay, MMR diversity, a relevance threshold and a hard token
//! budget. Facts are mined from finished conversations, deduplicated on
//! write and pruned by age.
//!
//! The embedding model and the LLM are capabilities supplied by the caller
//! through [`EmbeddingAdapter`] and [`ProviderAdapter`].
//!
//! ```no_run
//! # async fn run(
//! #     embedder: std::sync::Arc<dyn mimir::EmbeddingAdapter>,
//! #     llm: std::sync::Arc<dyn mimir::ProviderAdapter>,
//! # ) -> Result<(), mimir::MimirError> {
//! let config = mimir::load_config()?;
//! mimir::init_tracing(&config.log.level);
//! let engine = mimir::bootstrap(&config, embedder, Some(llm)).await?;
//!
//! engine.add_message("s1", "user", "My dog's name is Max.").await?;
//! engine.on_session_end("s1");
//! let hits = engine.search_memory("what is my dog called?", Some("s1"), None).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::info;

pub use mimir_config::MimirConfig;
pub use mimir_core::traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
pub use mimir_core::{MimirError, types};
pub use mimir_memory::{
    EpisodicCategory, MemoryEngine, MemoryItem, NewMemory, Partition, PruneReport, ReindexReport,
    RememberOutcome, ScoredMemory,
};
pub use mimir_router::{QueryRouter, RouteDecision, RouteTarget};
pub use mimir_storage::Database;

/// Load configuration from the standard file hierarchy and `MIMIR_*`
/// environment variables, validating it.
///
/// Diagnostics are rendered to stderr before the error is returned.
pub fn load_config() -> Result<MimirConfig, MimirError> {
    mimir_config::load_and_validate().map_err(|errors| {
        mimir_config::render_errors(&errors);
        config_error(&errors)
    })
}

fn config_error(errors: &[mimir_config::ConfigError]) -> MimirError {
    let joined = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    MimirError::Config(joined)
}

/// Validate `config`, open its database and load the indexes.
///
/// Pass `None` for `provider` to run without post-session extraction.
pub async fn bootstrap(
    config: &MimirConfig,
    embedder: Arc<dyn EmbeddingAdapter>,
    provider: Option<Arc<dyn ProviderAdapter>>,
) -> Result<Arc<MemoryEngine>, MimirError> {
    mimir_config::validation::validate_config(config).map_err(|errors| config_error(&errors))?;

    let db = Arc::new(Database::open_with_config(&config.storage).await?);
    let engine = MemoryEngine::open(db, embedder, provider, config).await?;
    info!(database = %config.storage.database_path, "mimir started");
    Ok(Arc::new(engine))
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence when set. Safe to call more than once; later
/// calls are ignored.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mimir={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
