// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the memory engine through its public API.

use std::sync::Arc;

use chrono::{Duration, Utc};
use mimir::{EmbeddingAdapter, MimirConfig, MimirError, NewMemory, Partition, RememberOutcome};
use mimir_memory::{MemoryItem, MemoryStore};
use mimir_storage::timestamp;
use mimir_test_utils::{MockEmbedder, TestHarness};

const EXTRACTED: &str = r#"[
    {"content": "User's dog is named Max", "category": "entity", "confidence": 0.9},
    {"content": "User prefers dark mode", "category": "preference"}
]"#;

async fn harness() -> TestHarness {
    TestHarness::builder().build().await.unwrap()
}

fn days_ago(days: i64) -> String {
    timestamp::format(Utc::now() - Duration::days(days))
}

async fn stored_item(h: &TestHarness, id: &str, content: &str, created_days_ago: i64, accessed_days_ago: i64) {
    let item = MemoryItem {
        id: id.to_string(),
        partition: Partition::Episodic,
        content: content.to_string(),
        embedding: h.embedder.hash_embed(content),
        category: "factual".to_string(),
        confidence: 0.8,
        session_id: None,
        created_at: days_ago(created_days_ago),
        last_accessed_at: days_ago(accessed_days_ago),
    };
    MemoryStore::new(Arc::clone(&h.db)).insert(&item).await.unwrap();
}

// --- Read path ---

#[tokio::test]
async fn recall_query_searches_episodic_only() {
    let h = harness().await;
    h.engine.remember_fact("User's dog is named Max", "entity").await.unwrap();
    h.engine.remember_fact("Dogs descend from grey wolves", "biology").await.unwrap();

    let results = h
        .engine
        .search_memory("do you remember what my dog is named?", None, None)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.memory.partition == Partition::Episodic));
    assert_eq!(results[0].memory.content, "User's dog is named Max");
}

#[tokio::test]
async fn definition_query_searches_knowledge_only() {
    let h = harness().await;
    h.engine
        .remember_fact("Rust ownership moves values between bindings", "rust")
        .await
        .unwrap();
    h.engine.remember_fact("User writes Rust at work", "factual").await.unwrap();

    let results = h
        .engine
        .search_memory("what is ownership in rust?", None, None)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.memory.partition == Partition::Knowledge));
    assert!(results[0].memory.content.contains("ownership"));
}

#[tokio::test]
async fn partition_override_skips_router() {
    let h = harness().await;
    h.engine.remember_fact("User drinks green tea daily", "habit").await.unwrap();

    let routed = h.engine.search_memory("what is green tea?", None, None).await.unwrap();
    assert!(routed.is_empty());

    let forced = h
        .engine
        .search_memory("what is green tea?", None, Some(Partition::Episodic))
        .await
        .unwrap();
    assert_eq!(forced.len(), 1);
}

#[tokio::test]
async fn results_respect_token_budget() {
    let mut config = MimirConfig::default();
    config.reranker.min_score = 0.0;
    config.reranker.top_k = 10;
    config.reranker.max_tokens = 20;
    let h = TestHarness::builder().with_config(config).build().await.unwrap();

    for fact in [
        "User brews oolong tea every single morning before work starts",
        "User keeps a tea journal with tasting notes since last spring",
        "User bought a clay teapot from a market in Yixing once",
        "User prefers tea without sugar or milk at any time",
        "User hosts a small tea tasting club on Sunday afternoons",
    ] {
        assert!(h.engine.remember_fact(fact, "habit").await.unwrap());
    }

    let results = h
        .engine
        .search_memory("tea", None, Some(Partition::Episodic))
        .await
        .unwrap();
    let used: usize = results.iter().map(|r| r.estimated_tokens).sum();
    assert_eq!(results.len(), 1);
    assert!(used <= 20);
}

#[tokio::test]
async fn session_scoping_hides_other_sessions() {
    let h = harness().await;
    h.engine
        .remember(NewMemory::episodic("User is training for a marathon", mimir::EpisodicCategory::Habit, Some("s1".into())))
        .await
        .unwrap();

    let own = h
        .engine
        .search_memory("marathon", Some("s1"), Some(Partition::Episodic))
        .await
        .unwrap();
    let other = h
        .engine
        .search_memory("marathon", Some("s2"), Some(Partition::Episodic))
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert!(other.is_empty());
}

#[tokio::test]
async fn embedding_outage_degrades_to_keyword_search() {
    let h = harness().await;
    h.engine.remember_fact("User drinks green tea daily", "habit").await.unwrap();
    h.embedder.set_failing(true);

    let results = h
        .engine
        .search_memory("green tea", None, Some(Partition::Episodic))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let err = h.engine.remember_fact("User owns a bicycle", "factual").await.unwrap_err();
    assert!(matches!(err, MimirError::Embedding { .. }));
}

#[tokio::test]
async fn search_refreshes_last_access() {
    let h = harness().await;
    stored_item(&h, "stale", "User collects vinyl records", 6, 5).await;
    h.engine.reindex().await.unwrap();

    let results = h
        .engine
        .search_memory("vinyl records", None, Some(Partition::Episodic))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    h.engine.shutdown().await;
    let item = MemoryStore::new(Arc::clone(&h.db))
        .get_by_id("stale")
        .await
        .unwrap()
        .unwrap();
    let accessed = timestamp::parse(&item.last_accessed_at).unwrap();
    assert!(Utc::now() - accessed < Duration::minutes(5));
}

#[tokio::test]
async fn stopword_overlap_alone_is_not_relevant() {
    let h = harness().await;
    h.engine.remember_fact("The Eiffel Tower is in Paris", "geography").await.unwrap();

    let unrelated = h
        .engine
        .search_memory("the weather tomorrow", None, Some(Partition::Knowledge))
        .await
        .unwrap();
    assert!(unrelated.is_empty());

    let related = h
        .engine
        .search_memory("where is the Eiffel Tower?", None, Some(Partition::Knowledge))
        .await
        .unwrap();
    assert_eq!(related.len(), 1);
}

#[tokio::test]
async fn long_untouched_memories_fade_out() {
    let h = harness().await;
    stored_item(&h, "ancient", "User collects vinyl records", 400, 365).await;
    h.engine.reindex().await.unwrap();

    let results = h
        .engine
        .search_memory("vinyl records", None, Some(Partition::Episodic))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn per_call_timeout_bounds_slow_embedding() {
    let h = harness().await;
    h.engine.remember_fact("User drinks green tea daily", "habit").await.unwrap();
    h.embedder.set_delay(Some(std::time::Duration::from_secs(30))).await;

    let started = std::time::Instant::now();
    let results = h
        .engine
        .search_memory_with_timeout(
            "green tea",
            None,
            Some(Partition::Episodic),
            std::time::Duration::from_millis(100),
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

// --- Write path ---

#[tokio::test]
async fn repeated_fact_is_stored_once() {
    let h = harness().await;
    assert!(h.engine.remember_fact("User prefers dark mode", "preference").await.unwrap());
    assert!(!h.engine.remember_fact("User prefers dark mode", "preference").await.unwrap());
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 1);
}

#[tokio::test]
async fn semantically_close_fact_is_rejected() {
    let embedder = Arc::new(MockEmbedder::with_dimensions(2));
    embedder.pin("User prefers dark mode", vec![1.0, 0.0]).await;
    embedder.pin("User likes dark mode", vec![0.95, 0.3122]).await;
    let h = TestHarness::builder()
        .with_embedder(embedder)
        .build()
        .await
        .unwrap();

    assert!(h.engine.remember_fact("User prefers dark mode", "preference").await.unwrap());
    assert!(!h.engine.remember_fact("User likes dark mode", "preference").await.unwrap());

    let reopened = h.reopen().await.unwrap();
    assert_eq!(reopened.indexed_len(Partition::Episodic), 1);
}

#[tokio::test]
async fn concurrent_writers_store_one_row() {
    let h = harness().await;
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = Arc::clone(&h.engine);
        handles.push(tokio::spawn(async move {
            engine.remember_fact("User lives in Lisbon", "factual").await.unwrap()
        }));
    }
    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);

    let reopened = h.reopen().await.unwrap();
    assert_eq!(reopened.indexed_len(Partition::Episodic), 1);
}

#[tokio::test]
async fn rejects_empty_content_and_unknown_episodic_category() {
    let h = harness().await;
    let err = h.engine.remember_fact("   ", "preference").await.unwrap_err();
    assert!(matches!(err, MimirError::InvalidInput(_)));

    let bad = NewMemory {
        category: "mood".to_string(),
        ..NewMemory::episodic("User is happy", mimir::EpisodicCategory::Factual, None)
    };
    let err = h.engine.remember(bad).await.unwrap_err();
    assert!(matches!(err, MimirError::InvalidInput(_)));
    assert_eq!(h.embedder.call_count(), 0);
}

#[tokio::test]
async fn long_content_is_truncated() {
    let mut config = MimirConfig::default();
    config.memory.max_content_chars = 12;
    let h = TestHarness::builder().with_config(config).build().await.unwrap();

    let outcome = h
        .engine
        .remember(NewMemory::knowledge("abcdefghijklmnopqrstuvwxyz", "letters"))
        .await
        .unwrap();
    let stored = MemoryStore::new(Arc::clone(&h.db))
        .get_by_id(outcome.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, "abcdefghijkl");
}

#[tokio::test]
async fn forget_removes_from_store_and_index() {
    let h = harness().await;
    let outcome = h
        .engine
        .remember(NewMemory::knowledge("Tokio is an async runtime", "rust"))
        .await
        .unwrap();
    let RememberOutcome::Inserted { id } = outcome else {
        panic!("expected an insert");
    };

    assert!(h.engine.forget(&id).await.unwrap());
    assert_eq!(h.engine.indexed_len(Partition::Knowledge), 0);
    assert!(!h.engine.forget(&id).await.unwrap());
}

// --- Transcript and extraction ---

#[tokio::test]
async fn session_end_extracts_and_indexes_facts() {
    let h = TestHarness::builder()
        .with_mock_responses(vec![EXTRACTED.to_string(), EXTRACTED.to_string()])
        .build()
        .await
        .unwrap();
    h.converse(
        "s1",
        &[
            ("user", "My dog's name is Max. Also, please use dark mode."),
            ("assistant", "Noted! Max is a great name."),
        ],
    )
    .await
    .unwrap();

    let stored = h.engine.on_session_end("s1").await.unwrap();
    assert_eq!(stored, 2);
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 2);

    let requests = h.provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].messages[0].content.contains("My dog's name is Max"));

    let results = h
        .engine
        .search_memory("do you remember what my dog is named?", Some("s1"), None)
        .await
        .unwrap();
    assert_eq!(results[0].memory.content, "User's dog is named Max");

    // Same facts again: all duplicates.
    assert_eq!(h.engine.extract_session("s1").await.unwrap(), 0);
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 2);
}

#[tokio::test]
async fn provider_failure_stores_nothing() {
    let h = TestHarness::builder()
        .with_mock_responses(vec![EXTRACTED.to_string()])
        .build()
        .await
        .unwrap();
    h.converse("s1", &[("user", "My dog's name is Max.")]).await.unwrap();
    h.provider.set_failing(true);

    assert_eq!(h.engine.on_session_end("s1").await.unwrap(), 0);
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 0);
}

#[tokio::test]
async fn extraction_skipped_without_provider_or_transcript() {
    let h = TestHarness::builder().without_provider().build().await.unwrap();
    h.converse("s1", &[("user", "My dog's name is Max.")]).await.unwrap();
    assert_eq!(h.engine.on_session_end("s1").await.unwrap(), 0);
    assert_eq!(h.provider.call_count(), 0);

    let h = harness().await;
    assert_eq!(h.engine.on_session_end("empty").await.unwrap(), 0);
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn shutdown_waits_for_extraction() {
    let h = TestHarness::builder()
        .with_mock_responses(vec![EXTRACTED.to_string()])
        .build()
        .await
        .unwrap();
    h.converse("s1", &[("user", "My dog's name is Max.")]).await.unwrap();

    let _handle = h.engine.on_session_end("s1");
    h.engine.shutdown().await;
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 2);
}

// --- Maintenance ---

#[tokio::test]
async fn pruning_removes_only_old_facts() {
    let h = harness().await;
    stored_item(&h, "old", "User used to live in Porto", 60, 60).await;
    stored_item(&h, "recent", "User started learning piano", 10, 10).await;
    h.engine.reindex().await.unwrap();

    assert_eq!(h.engine.prune_old_facts(30).await.unwrap(), 1);
    assert_eq!(h.engine.prune_old_facts(30).await.unwrap(), 0);
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 1);

    let store = MemoryStore::new(Arc::clone(&h.db));
    assert!(store.get_by_id("old").await.unwrap().is_none());
    assert!(store.get_by_id("recent").await.unwrap().is_some());
}

#[tokio::test]
async fn reindex_repairs_index_from_store() {
    let h = harness().await;
    stored_item(&h, "a", "User plays chess on weekends", 1, 1).await;
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 0);

    let report = h.engine.reindex().await.unwrap();
    assert_eq!(report.episodic, 1);
    assert_eq!(report.knowledge, 0);
    assert_eq!(h.engine.indexed_len(Partition::Episodic), 1);
}

// --- Bootstrap ---

#[tokio::test]
async fn bootstrap_opens_engine_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MimirConfig::default();
    config.storage.database_path = dir.path().join("nested/mimir.db").to_string_lossy().into_owned();

    let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(MockEmbedder::new());
    let engine = mimir::bootstrap(&config, Arc::clone(&embedder), None).await.unwrap();
    assert!(engine.remember_fact("User prefers dark mode", "preference").await.unwrap());
    engine.shutdown().await;
    drop(engine);

    let engine = mimir::bootstrap(&config, embedder, None).await.unwrap();
    assert_eq!(engine.indexed_len(Partition::Episodic), 1);
}

#[tokio::test]
async fn bootstrap_rejects_invalid_config() {
    let mut config = MimirConfig::default();
    config.reranker.min_score = 1.5;
    let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(MockEmbedder::new());

    let err = mimir::bootstrap(&config, embedder, None).await.err().expect("expected bootstrap error");
    match err {
        MimirError::Config(msg) => assert!(msg.contains("reranker.min_score")),
        other => panic!("expected config error, got {other}"),
    }
}
