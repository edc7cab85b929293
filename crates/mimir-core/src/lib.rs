// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mimir memory engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Mimir workspace. The embedding and LLM
//! capabilities consumed by the engine implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MimirError;
pub use types::{AdapterType, HealthStatus, Message};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
