// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite metadata store for the Mimir memory engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. The transcript
//! lives here; the fact table is created here and queried by
//! `mimir-memory`.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod timestamp;

pub use database::Database;
pub use models::*;
