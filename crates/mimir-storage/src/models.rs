// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `mimir-core::types`; this module
//! re-exports them for use within the storage crate.

pub use mimir_core::types::Message;
