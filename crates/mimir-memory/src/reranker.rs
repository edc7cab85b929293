// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold filter, top-K cap and hard token budget.
//!
//! Order matters: threshold first, then sort and cap, then walk the capped
//! list accumulating estimated tokens and stop at the first item that would
//! exceed the budget. The sum of `estimated_tokens` in the output never
//! exceeds `max_tokens`.

use mimir_config::model::RerankerConfig;
use tracing::debug;

use crate::types::{ScoredMemory, estimate_tokens};

const DEFAULT_TOKEN_MULTIPLIER: f64 = 1.3;

/// Stateless result selector. Share freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Reranker {
    pub min_score: f32,
    pub top_k: usize,
    pub max_tokens: usize,
    pub token_multiplier: f64,
}

impl Reranker {
    pub fn new(min_score: f32, top_k: usize, max_tokens: usize) -> Self {
        Self {
            min_score,
            top_k,
            max_tokens,
            token_multiplier: DEFAULT_TOKEN_MULTIPLIER,
        }
    }

    pub fn from_config(config: &RerankerConfig) -> Self {
        Self {
            min_score: config.min_score as f32,
            top_k: config.top_k,
            max_tokens: config.max_tokens,
            token_multiplier: config.token_multiplier,
        }
    }

    /// Select the final, budgeted result list.
    pub fn rank(&self, query: &str, results: Vec<ScoredMemory>) -> Vec<ScoredMemory> {
        let candidates = results.len();

        let mut kept: Vec<ScoredMemory> = results
            .into_iter()
            .filter(|r| r.score >= self.min_score)
            .collect();
        let above_threshold = kept.len();

        kept.sort_by(|a, b| b.score.total_cmp(&a.score));
        kept.truncate(self.top_k);

        let mut budgeted = Vec::with_capacity(kept.len());
        let mut used = 0usize;
        for mut result in kept {
            let tokens = estimate_tokens(&result.memory.content, self.token_multiplier);
            if used + tokens > self.max_tokens {
                break;
            }
            used += tokens;
            result.estimated_tokens = tokens;
            budgeted.push(result);
        }

        debug!(
            query_chars = query.chars().count(),
            candidates,
            above_threshold,
            returned = budgeted.len(),
            tokens = used,
            "reranked"
        );
        budgeted
    }
}

impl Default for Reranker {
    fn default() -> Self {
        Self::from_config(&RerankerConfig::default())
    }
}
