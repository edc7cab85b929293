// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mimir integration tests.
//!
//! Provides mock capabilities and a test harness for fast, deterministic,
//! CI-runnable tests without a real embedding model or LLM.
//!
//! # Components
//!
//! - [`MockEmbedder`] - Deterministic hashing bag-of-words embedder
//! - [`MockProvider`] - Mock LLM provider with queued responses and failure injection
//! - [`TestHarness`] - Temp database plus a fully wired [`mimir_memory::MemoryEngine`]

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
