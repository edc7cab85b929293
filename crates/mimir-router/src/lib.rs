// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query intent routing for the Mimir memory engine.
//!
//! This crate provides:
//! - [`QueryRouter`]: marker-based intent classification (zero-cost, zero-latency)
//! - [`RouteTarget`]: which memory partitions a query should search
//!
//! The router runs before any index access. It never touches the network,
//! the store, or the indexes.

pub mod markers;
pub mod router;

pub use markers::Marker;
pub use router::{QueryRouter, RouteDecision, RouteTarget};
