// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Score fusion, temporal decay and MMR diversity.

use std::collections::HashMap;

use crate::types::{ScoredMemory, SearchHit, cosine_similarity, jaccard_similarity};

/// Reciprocal Rank Fusion over any number of ranked lists.
///
/// score(d) = sum over lists containing d of 1 / (k + rank), rank 1-based.
/// Output is sorted by fused score descending, ties broken by id.
pub fn reciprocal_rank_fusion(lists: &[&[SearchHit]], k: f32) -> Vec<(String, f32)> {
    let mut scores: HashMap<&str, f32> = HashMap::new();
    for list in lists {
        for (rank, hit) in list.iter().enumerate() {
            *scores.entry(hit.id.as_str()).or_insert(0.0) += 1.0 / (k + rank as f32 + 1.0);
        }
    }

    let mut fused: Vec<(String, f32)> = scores
        .into_iter()
        .map(|(id, score)| (id.to_string(), score))
        .collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    fused
}

/// Largest fused score `lists` ranked lists can produce: rank 1 in each.
pub fn max_fused_score(lists: usize, k: f32) -> f32 {
    lists as f32 / (k + 1.0)
}

/// Scale fused scores into [0, 1] against the best score `lists` lists
/// could give, so 1.0 means rank 1 everywhere and a rank-1 hit found by
/// only one of two lists scores 0.5.
pub fn normalize_scores(results: &mut [ScoredMemory], lists: usize, k: f32) {
    let max = max_fused_score(lists, k);
    if max > 0.0 {
        for r in results.iter_mut() {
            r.score = (r.score / max).min(1.0);
        }
    }
}

/// Exponential decay with an optional floor.
///
/// Returns `(1 - weight) + weight * 2^(-age_days / half_life)`, or 1.0 when
/// the partition has no half-life. With `weight` 1.0 this is the plain
/// half-life curve: 0.5 after one half-life, 0.25 after two.
pub fn decay_factor(age_days: f64, half_life_days: Option<f64>, weight: f64) -> f32 {
    match half_life_days {
        Some(half_life) if half_life > 0.0 => {
            let weight = weight.clamp(0.0, 1.0);
            let exp = (-age_days.max(0.0) / half_life).exp2();
            ((1.0 - weight) + weight * exp) as f32
        }
        _ => 1.0,
    }
}

fn similarity(a: &ScoredMemory, b: &ScoredMemory) -> f32 {
    let (ea, eb) = (&a.memory.embedding, &b.memory.embedding);
    if !ea.is_empty() && ea.len() == eb.len() {
        cosine_similarity(ea, eb)
    } else {
        jaccard_similarity(&a.memory.content, &b.memory.content)
    }
}

/// Greedy maximal marginal relevance.
///
/// The first pick is the most relevant item. Each later pick maximises
/// `score - ((1 - lambda) / lambda) * max_sim(candidate, selected)` and keeps
/// that adjusted score. Returns every candidate in selection order.
pub fn mmr_rerank(candidates: Vec<ScoredMemory>, lambda: f32) -> Vec<ScoredMemory> {
    if candidates.len() <= 1 {
        return candidates;
    }
    let lambda = lambda.clamp(f32::EPSILON, 1.0);
    let penalty = (1.0 - lambda) / lambda;

    let mut remaining = candidates;
    let mut selected: Vec<ScoredMemory> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (idx, candidate) in remaining.iter().enumerate() {
            let max_sim = selected
                .iter()
                .map(|s| similarity(candidate, s))
                .fold(0.0f32, f32::max);
            let adjusted = candidate.score - penalty * max_sim;
            if adjusted > best_score {
                best_score = adjusted;
                best_idx = idx;
            }
        }
        let mut pick = remaining.remove(best_idx);
        pick.score = best_score;
        selected.push(pick);
    }

    selected
}
