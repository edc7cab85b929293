// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter for tests.
//!
//! Each lowercase word is hashed (FNV-1a) onto one of `dimensions` axes and
//! the resulting bag-of-words vector is L2-normalised. Texts sharing most of
//! their words therefore land close together, and the same text always
//! yields the same vector. Exact vectors can be pinned per text when a test
//! needs a specific similarity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mimir_core::MimirError;
use mimir_core::traits::{EmbeddingAdapter, PluginAdapter};
use mimir_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

const DEFAULT_DIMENSIONS: usize = 64;

pub struct MockEmbedder {
    dimensions: usize,
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            pinned: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `vector` whenever exactly `text` is embedded.
    pub async fn pin(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.pinned.lock().await.insert(text.into(), vector);
    }

    /// Make every subsequent call fail with an embedding error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Sleep before answering, to exercise search deadlines.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The hashed bag-of-words vector for `text`.
    pub fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let slot = (fnv1a(word.as_bytes()) % self.dimensions as u64) as usize;
            v[slot] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        } else {
            // Wordless input still needs a usable vector.
            v[0] = 1.0;
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MimirError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MimirError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MimirError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MimirError::Embedding {
                message: "mock embedder failure".to_string(),
            });
        }

        let pinned = self.pinned.lock().await;
        let embeddings = input
            .texts
            .iter()
            .map(|t| pinned.get(t).cloned().unwrap_or_else(|| self.hash_embed(t)))
            .collect();
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}
