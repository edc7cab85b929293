// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed fact store with vector BLOB storage and an FTS5 keyword
//! index.
//!
//! The store is authoritative. The in-memory vector indexes are derived
//! from it and can be rebuilt at any time with
//! [`MemoryStore::load_partition`]. Keyword search runs against the
//! `memory_items_fts` table, which triggers keep in sync with every write.

use std::sync::Arc;

use mimir_core::MimirError;
use mimir_storage::Database;
use rusqlite::{OptionalExtension, Row, params};

use crate::fts;
use crate::types::{MemoryItem, Partition, SearchHit, SearchSource, blob_to_vec, vec_to_blob};

const COLUMNS: &str =
    "id, partition, content, embedding, category, confidence, session_id, created_at, last_accessed_at";

/// Persistent store for memory items.
pub struct MemoryStore {
    db: Arc<Database>,
}

impl MemoryStore {
    /// Wrap an open database. Migrations have already run.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new item.
    pub async fn insert(&self, item: &MemoryItem) -> Result<(), MimirError> {
        let item = item.clone();
        let blob = vec_to_blob(&item.embedding);
        let dimensions = item.embedding.len() as i64;
        let terms = fts::search_terms(&item.content);
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO memory_items (id, partition, content, embedding, dimensions, category, confidence, session_id, created_at, last_accessed_at, search_terms)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        item.id,
                        item.partition.as_str(),
                        item.content,
                        blob,
                        dimensions,
                        item.category,
                        item.confidence,
                        item.session_id,
                        item.created_at,
                        item.last_accessed_at,
                        terms,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Get an item by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<MemoryItem>, MimirError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<MemoryItem>, rusqlite::Error> {
                let sql = format!("SELECT {COLUMNS} FROM memory_items WHERE id = ?1");
                conn.query_row(&sql, params![id], row_to_item).optional()
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Every item in a partition, oldest first.
    pub async fn load_partition(&self, partition: Partition) -> Result<Vec<MemoryItem>, MimirError> {
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<MemoryItem>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {COLUMNS} FROM memory_items WHERE partition = ?1 ORDER BY created_at ASC, id ASC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![partition.as_str()], row_to_item)?;
                rows.collect()
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Search memories using BM25 via FTS5.
    ///
    /// Returns hits in relevance order. `raw_score` is the negated `bm25()`
    /// value, so larger is better. `session_id` limits results to items
    /// owned by that session or by no session.
    pub async fn keyword_search(
        &self,
        partition: Partition,
        query: &str,
        limit: usize,
        session_id: Option<&str>,
    ) -> Result<Vec<SearchHit>, MimirError> {
        let Some(expression) = fts::match_expression(query) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let session_id = session_id.map(str::to_string);
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<SearchHit>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT m.id, bm25(memory_items_fts) FROM memory_items_fts
                     JOIN memory_items m ON m.rowid = memory_items_fts.rowid
                     WHERE memory_items_fts MATCH ?1 AND m.partition = ?2
                       AND (?3 IS NULL OR m.session_id IS NULL OR m.session_id = ?3)
                     ORDER BY bm25(memory_items_fts), m.id LIMIT ?4",
                )?;
                let rows = stmt.query_map(
                    params![expression, partition.as_str(), session_id, limit],
                    |row| {
                        let score: f64 = row.get(1)?;
                        Ok(SearchHit {
                            id: row.get(0)?,
                            raw_score: -score as f32,
                            source: SearchSource::Keyword,
                        })
                    },
                )?;
                rows.collect()
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Number of items in a partition.
    pub async fn count(&self, partition: Partition) -> Result<usize, MimirError> {
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM memory_items WHERE partition = ?1",
                    params![partition.as_str()],
                    |row| row.get(0),
                )?;
                Ok(n as usize)
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Delete one item. Returns whether a row existed.
    pub async fn delete(&self, id: &str) -> Result<bool, MimirError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let n = conn.execute("DELETE FROM memory_items WHERE id = ?1", params![id])?;
                Ok(n > 0)
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Delete up to `limit` items of `partition` created before `cutoff` in
    /// a single transaction. Returns the deleted ids so the caller can drop
    /// them from the index.
    pub async fn delete_created_before(
        &self,
        partition: Partition,
        cutoff: &str,
        limit: usize,
    ) -> Result<Vec<String>, MimirError> {
        let cutoff = cutoff.to_string();
        let limit = i64::try_from(limit.max(1)).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                let tx = conn.transaction()?;
                let victims: Vec<String> = {
                    let mut stmt = tx.prepare(
                        "SELECT id FROM memory_items WHERE partition = ?1 AND created_at < ?2 ORDER BY created_at ASC LIMIT ?3",
                    )?;
                    let rows = stmt.query_map(params![partition.as_str(), cutoff, limit], |row| row.get(0))?;
                    rows.collect::<Result<_, _>>()?
                };
                {
                    let mut del = tx.prepare("DELETE FROM memory_items WHERE id = ?1")?;
                    for id in &victims {
                        del.execute(params![id])?;
                    }
                }
                tx.commit()?;
                Ok(victims)
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Set `last_accessed_at` on a batch of items.
    pub async fn touch(&self, ids: Vec<String>, accessed_at: &str) -> Result<usize, MimirError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let accessed_at = accessed_at.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let mut updated = 0;
                {
                    let mut stmt =
                        tx.prepare("UPDATE memory_items SET last_accessed_at = ?1 WHERE id = ?2")?;
                    for id in &ids {
                        updated += stmt.execute(params![accessed_at, id])?;
                    }
                }
                tx.commit()?;
                Ok(updated)
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Reinforce an existing item: raise confidence to at least `confidence`
    /// and refresh `last_accessed_at`. Returns the number of rows updated,
    /// 0 if the item no longer exists.
    pub async fn reinforce(
        &self,
        id: &str,
        confidence: f64,
        accessed_at: &str,
    ) -> Result<usize, MimirError> {
        let id = id.to_string();
        let accessed_at = accessed_at.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE memory_items SET confidence = MAX(confidence, ?1), last_accessed_at = ?2 WHERE id = ?3",
                    params![confidence, accessed_at, id],
                )
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Keep `keep_id` with confidence raised to `confidence` and delete
    /// `drop_id`, atomically.
    pub async fn merge(
        &self,
        keep_id: &str,
        drop_id: &str,
        confidence: f64,
    ) -> Result<(), MimirError> {
        let keep_id = keep_id.to_string();
        let drop_id = drop_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "UPDATE memory_items SET confidence = MAX(confidence, ?1) WHERE id = ?2",
                    params![confidence, keep_id],
                )?;
                tx.execute("DELETE FROM memory_items WHERE id = ?1", params![drop_id])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(MimirError::storage)
    }
}

fn row_to_item(row: &Row<'_>) -> Result<MemoryItem, rusqlite::Error> {
    let partition: String = row.get(1)?;
    let partition = Partition::from_str_value(&partition).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown partition '{partition}'").into(),
        )
    })?;
    let blob: Vec<u8> = row.get(3)?;
    Ok(MemoryItem {
        id: row.get(0)?,
        partition,
        content: row.get(2)?,
        embedding: blob_to_vec(&blob),
        category: row.get(4)?,
        confidence: row.get(5)?,
        session_id: row.get(6)?,
        created_at: row.get(7)?,
        last_accessed_at: row.get(8)?,
    })
}
