// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./mimir.toml` > `~/.config/mimir/mimir.toml` > `/etc/mimir/mimir.toml`
//! with environment variable overrides via `MIMIR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MimirConfig;

/// Config sections that env var keys are mapped into.
const SECTIONS: &[&str] = &[
    "log",
    "storage",
    "memory",
    "reranker",
    "extraction",
    "pruning",
    "router",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mimir/mimir.toml` (system-wide)
/// 3. `~/.config/mimir/mimir.toml` (user XDG config)
/// 4. `./mimir.toml` (local directory)
/// 5. `MIMIR_*` environment variables
pub fn load_config() -> Result<MimirConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MimirConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MimirConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MimirConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MimirConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MimirConfig::default()))
        .merge(Toml::file("/etc/mimir/mimir.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("mimir/mimir.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("mimir.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: `MIMIR_MEMORY_DUPLICATE_THRESHOLD`
/// must map to `memory.duplicate_threshold`, not `memory.duplicate.threshold`.
fn env_provider() -> Env {
    Env::prefixed("MIMIR_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_first_segment_only() {
        assert_eq!(
            map_env_key("memory_duplicate_threshold"),
            "memory.duplicate_threshold"
        );
        assert_eq!(map_env_key("reranker_top_k"), "reranker.top_k");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("log_level"), "log.level");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("nonsense_key"), "nonsense_key");
    }
}
