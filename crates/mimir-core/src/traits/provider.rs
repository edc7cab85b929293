// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the LLM capability used by fact extraction.

use async_trait::async_trait;

use crate::error::MimirError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for LLM provider integrations.
///
/// The engine only ever issues single-shot completions and treats every
/// failure as non-fatal.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, MimirError>;
}
