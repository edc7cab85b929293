// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All SQL runs on tokio-rusqlite's single background thread, so the
//! `Database` handle is the single writer. Do NOT open additional
//! connections for writes.

use std::path::Path;

use mimir_config::model::StorageConfig;
use mimir_core::MimirError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations;

/// Handle to the metadata store.
///
/// Cheap to share behind an `Arc`; every call is queued onto the
/// connection's background thread.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL enabled and run
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, MimirError> {
        Self::open_with(path, true).await
    }

    /// Open the database described by a [`StorageConfig`].
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, MimirError> {
        Self::open_with(&config.database_path, config.wal_mode).await
    }

    /// Open a private in-memory database. Intended for tests.
    pub async fn open_in_memory() -> Result<Self, MimirError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(MimirError::storage)?;
        let db = Self { conn };
        db.configure(false).await?;
        Ok(db)
    }

    async fn open_with(path: &str, wal_mode: bool) -> Result<Self, MimirError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(MimirError::storage)?;
        }

        let conn = Connection::open(path).await.map_err(MimirError::storage)?;
        let db = Self { conn };
        db.configure(wal_mode).await?;
        info!(path, wal_mode, "metadata store opened");
        Ok(db)
    }

    async fn configure(&self, wal_mode: bool) -> Result<(), MimirError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                Ok(())
            })
            .await
            .map_err(MimirError::storage)?;

        self.conn
            .call(|conn| -> Result<(), MimirError> { migrations::run_migrations(conn) })
            .await
            .map_err(MimirError::storage)?;
        debug!("migrations applied");
        Ok(())
    }

    /// The underlying connection. Query modules call through `conn.call()`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Round-trip a trivial statement to verify the connection is alive.
    pub async fn ping(&self) -> Result<(), MimirError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(MimirError::storage)
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), MimirError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(MimirError::storage)?;
        self.conn.close().await.map_err(MimirError::storage)?;
        debug!("metadata store closed");
        Ok(())
    }
}
