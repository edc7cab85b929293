// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! so extraction can be exercised without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mimir_core::MimirError;
use mimir_core::traits::{PluginAdapter, ProviderAdapter};
use mimir_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage};

/// A mock LLM provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty, `[]`
/// is returned (nothing worth remembering).
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail: AtomicBool::new(false),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Make every subsequent call fail with a provider error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Sleep before answering, to exercise timeouts.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "[]".to_string())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MimirError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MimirError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, MimirError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MimirError::Provider {
                message: "mock provider failure".to_string(),
                source: None,
            });
        }

        let text = self.next_response().await;
        Ok(ProviderResponse {
            id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
            content: text,
            model: request.model,
            stop_reason: Some("end_turn".to_string()),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "test-model".to_string(),
            system_prompt: None,
            messages: vec![],
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn empty_array_when_queue_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(request()).await.unwrap();
        assert_eq!(resp.content, "[]");
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider = MockProvider::with_responses(vec!["first".to_string(), "second".to_string()]);

        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert_eq!(provider.complete(request()).await.unwrap().content, "second");
        assert_eq!(provider.complete(request()).await.unwrap().content, "[]");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn failure_injection() {
        let provider = MockProvider::with_responses(vec!["kept".to_string()]);
        provider.set_failing(true);
        assert!(matches!(
            provider.complete(request()).await,
            Err(MimirError::Provider { .. })
        ));
        provider.set_failing(false);
        assert_eq!(provider.complete(request()).await.unwrap().content, "kept");
    }

    #[tokio::test]
    async fn requests_are_captured() {
        let provider = MockProvider::new();
        provider.add_response("x").await;
        provider.complete(request()).await.unwrap();
        let seen = provider.requests().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "test-model");
    }
}
