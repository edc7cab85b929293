// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Brute-force cosine search over a partition snapshot.

use std::sync::Arc;

use crate::types::{MemoryItem, cosine_similarity};

/// Score every item against `query`, keep those at or above `min_similarity`,
/// best first, at most `limit`. Items whose dimensionality differs from the
/// query are skipped.
pub fn search<'a>(
    items: impl Iterator<Item = &'a Arc<MemoryItem>>,
    query: &[f32],
    min_similarity: f32,
    limit: usize,
) -> Vec<(String, f32)> {
    let mut results: Vec<(String, f32)> = items
        .filter(|item| item.embedding.len() == query.len())
        .filter_map(|item| {
            let similarity = cosine_similarity(query, &item.embedding);
            (similarity >= min_similarity).then(|| (item.id.clone(), similarity))
        })
        .collect();

    results.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Partition;

    fn item(id: &str, embedding: Vec<f32>) -> Arc<MemoryItem> {
        Arc::new(MemoryItem {
            id: id.to_string(),
            partition: Partition::Knowledge,
            content: id.to_string(),
            embedding,
            category: String::new(),
            confidence: 1.0,
            session_id: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            last_accessed_at: "2026-01-01T00:00:00.000Z".into(),
        })
    }

    #[test]
    fn returns_most_similar_first() {
        let items = vec![
            item("a", vec![0.5, 0.5, 0.0]),
            item("b", vec![0.9, 0.1, 0.0]),
            item("c", vec![0.0, 1.0, 0.0]),
        ];
        let hits = search(items.iter(), &[1.0, 0.0, 0.0], 0.0, 10);
        assert_eq!(hits[0].0, "b");
        assert_eq!(hits[1].0, "a");
    }

    #[test]
    fn threshold_excludes_weak_matches() {
        let items = vec![item("a", vec![1.0, 0.0]), item("b", vec![0.0, 1.0])];
        let hits = search(items.iter(), &[1.0, 0.0], 0.35, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
    }

    #[test]
    fn limit_and_dimension_mismatch() {
        let items = vec![
            item("a", vec![1.0, 0.0]),
            item("b", vec![0.9, 0.1]),
            item("wrong", vec![1.0, 0.0, 0.0]),
        ];
        let hits = search(items.iter(), &[1.0, 0.0], 0.0, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
    }
}
