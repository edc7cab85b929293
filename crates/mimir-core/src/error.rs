// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mimir memory engine.

use thiserror::Error;

/// The primary error type used across all Mimir adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MimirError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The embedding capability failed or returned an unusable vector.
    #[error("embedding error: {message}")]
    Embedding { message: String },

    /// LLM provider errors (API failure, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An embedding's dimensionality does not match its partition.
    #[error("dimension mismatch in {partition} partition: expected {expected}, got {actual}")]
    DimensionMismatch {
        partition: String,
        expected: usize,
        actual: usize,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// A single-flight operation is already running.
    #[error("busy: {0}")]
    Busy(String),

    /// Caller-supplied input was rejected (empty content, unknown category).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MimirError {
    /// Wraps any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MimirError::Storage {
            source: Box::new(err),
        }
    }
}
