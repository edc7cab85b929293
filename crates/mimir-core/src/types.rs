// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Mimir engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of capability an adapter provides.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
}

// --- Transcript types ---

/// A single transcript message persisted by the metadata store.
///
/// Messages are keyed by `(session_id, sequence)`; `sequence` starts at 1
/// and increases monotonically within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub session_id: String,
    pub sequence: i64,
    /// "user", "assistant" or "system".
    pub role: String,
    pub content: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Texts to embed, one vector per text.
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Dimensionality of every vector in `embeddings`.
    pub dimensions: usize,
}

// --- Provider types ---

/// A single message in a provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
    /// Conversation messages.
    pub messages: Vec<ProviderMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// A response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    /// Full text of the completion.
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

/// Token usage reported by a provider call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
