// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete memory engine with mock capabilities
//! and a temp SQLite database that is removed on drop.

use std::sync::Arc;

use mimir_config::model::{MimirConfig, StorageConfig};
use mimir_core::MimirError;
use mimir_core::traits::{EmbeddingAdapter, ProviderAdapter};
use mimir_memory::MemoryEngine;
use mimir_storage::Database;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: MimirConfig,
    responses: Vec<String>,
    embedder: Option<Arc<MockEmbedder>>,
    with_provider: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: MimirConfig::default(),
            responses: Vec::new(),
            embedder: None,
            with_provider: true,
        }
    }

    /// Replace the whole configuration. The storage section is overridden
    /// with the harness's temp database.
    pub fn with_config(mut self, config: MimirConfig) -> Self {
        self.config = config;
        self
    }

    /// Set mock provider responses (extraction output).
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Use a pre-built embedder, e.g. one with pinned vectors.
    pub fn with_embedder(mut self, embedder: Arc<MockEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Build the engine with no LLM capability.
    pub fn without_provider(mut self) -> Self {
        self.with_provider = false;
        self
    }

    /// Build the test harness, opening the database and the engine.
    pub async fn build(self) -> Result<TestHarness, MimirError> {
        let temp_dir = tempfile::TempDir::new().map_err(MimirError::storage)?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().into_owned();

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path,
            wal_mode: true,
        };

        let db = Arc::new(Database::open_with_config(&config.storage).await?);
        let embedder = self.embedder.unwrap_or_else(|| Arc::new(MockEmbedder::new()));
        let provider = Arc::new(MockProvider::with_responses(self.responses));

        let engine = MemoryEngine::open(
            Arc::clone(&db),
            Arc::clone(&embedder) as Arc<dyn EmbeddingAdapter>,
            self.with_provider
                .then(|| Arc::clone(&provider) as Arc<dyn ProviderAdapter>),
            &config,
        )
        .await?;

        Ok(TestHarness {
            engine: Arc::new(engine),
            db,
            embedder,
            provider,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock capabilities and temp storage.
pub struct TestHarness {
    /// The engine under test.
    pub engine: Arc<MemoryEngine>,
    /// Database shared with the engine (temp file, removed on drop).
    pub db: Arc<Database>,
    pub embedder: Arc<MockEmbedder>,
    pub provider: Arc<MockProvider>,
    /// Effective configuration, including the temp database path.
    pub config: MimirConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Open a second engine over the same database, as after a restart.
    pub async fn reopen(&self) -> Result<MemoryEngine, MimirError> {
        MemoryEngine::open(
            Arc::clone(&self.db),
            Arc::clone(&self.embedder) as Arc<dyn EmbeddingAdapter>,
            Some(Arc::clone(&self.provider) as Arc<dyn ProviderAdapter>),
            &self.config,
        )
        .await
    }

    /// Append a user/assistant exchange to a session transcript.
    pub async fn converse(&self, session_id: &str, turns: &[(&str, &str)]) -> Result<(), MimirError> {
        for (role, content) in turns {
            self.engine.add_message(session_id, role, content).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_memory::Partition;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert_eq!(harness.engine.indexed_len(Partition::Knowledge), 0);
        assert_eq!(harness.engine.indexed_len(Partition::Episodic), 0);
        harness.db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();

        h1.engine.remember_fact("Rust has no garbage collector", "rust").await.unwrap();
        assert_eq!(h1.engine.indexed_len(Partition::Knowledge), 1);
        assert_eq!(h2.engine.indexed_len(Partition::Knowledge), 0);
    }

    #[tokio::test]
    async fn reopen_sees_persisted_items() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.engine.remember_fact("User prefers dark mode", "preference").await.unwrap();
        let reopened = harness.reopen().await.unwrap();
        assert_eq!(reopened.indexed_len(Partition::Episodic), 1);
    }
}
