// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the capabilities the engine consumes.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod embedding;
pub mod provider;

pub use adapter::PluginAdapter;
pub use embedding::EmbeddingAdapter;
pub use provider::ProviderAdapter;
