// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::MimirError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for generating vector embeddings from text.
///
/// Implementations must be deterministic per model version: the same text
/// always produces the same vector, otherwise deduplication breaks.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Generates embeddings for the given input.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MimirError>;
}
