// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript CRUD operations.

use mimir_core::MimirError;
use rusqlite::{Row, params};

use crate::database::Database;
use crate::models::Message;
use crate::timestamp;

fn row_to_message(row: &Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        session_id: row.get(0)?,
        sequence: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Append a message to a session, assigning the next sequence number.
///
/// The sequence lookup and insert share one transaction, so concurrent
/// appends to the same session never collide.
pub async fn append_message(
    db: &Database,
    session_id: &str,
    role: &str,
    content: &str,
) -> Result<Message, MimirError> {
    let session_id = session_id.to_string();
    let role = role.to_string();
    let content = content.to_string();
    let created_at = timestamp::now();

    db.connection()
        .call(move |conn| -> Result<Message, rusqlite::Error> {
            let tx = conn.transaction()?;
            let sequence: i64 = tx.query_row(
                "SELECT COALESCE(MAX(sequence), 0) + 1 FROM messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO messages (session_id, sequence, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, sequence, role, content, created_at],
            )?;
            tx.commit()?;
            Ok(Message {
                session_id,
                sequence,
                role,
                content,
                created_at,
            })
        })
        .await
        .map_err(MimirError::storage)
}

/// Insert a fully-formed message, including its sequence and timestamp.
///
/// Used for imports and tests that need control over `created_at`.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), MimirError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (session_id, sequence, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.session_id,
                    msg.sequence,
                    msg.role,
                    msg.content,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(MimirError::storage)
}

/// Get every message for a session in sequence order.
pub async fn get_messages_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Vec<Message>, MimirError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT session_id, sequence, role, content, created_at
                 FROM messages WHERE session_id = ?1
                 ORDER BY sequence ASC",
            )?;
            let rows = stmt.query_map(params![session_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(MimirError::storage)
}

/// Get the last `limit` messages of a session, oldest first.
pub async fn get_recent_messages(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<Message>, MimirError> {
    let session_id = session_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT session_id, sequence, role, content, created_at FROM (
                     SELECT session_id, sequence, role, content, created_at
                     FROM messages WHERE session_id = ?1
                     ORDER BY sequence DESC LIMIT ?2
                 ) ORDER BY sequence ASC",
            )?;
            let rows = stmt.query_map(params![session_id, limit], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(MimirError::storage)
}

/// Delete messages created strictly before `cutoff`, `batch_size` rows per
/// transaction. Returns the total number of rows deleted.
pub async fn delete_messages_before(
    db: &Database,
    cutoff: &str,
    batch_size: usize,
) -> Result<usize, MimirError> {
    let batch = i64::try_from(batch_size.max(1)).unwrap_or(i64::MAX);
    let mut total = 0usize;

    loop {
        let cutoff = cutoff.to_string();
        let deleted = db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let n = tx.execute(
                    "DELETE FROM messages WHERE rowid IN (
                         SELECT rowid FROM messages WHERE created_at < ?1 LIMIT ?2
                     )",
                    params![cutoff, batch],
                )?;
                tx.commit()?;
                Ok(n)
            })
            .await
            .map_err(MimirError::storage)?;

        total += deleted;
        if deleted < batch_size.max(1) {
            break;
        }
        // Let readers in between batches.
        tokio::task::yield_now().await;
    }

    Ok(total)
}

/// Count messages in a session.
pub async fn count_messages(db: &Database, session_id: &str) -> Result<usize, MimirError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
        .map_err(MimirError::storage)
}
