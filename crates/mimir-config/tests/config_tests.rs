// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Mimir configuration system.

use std::path::Path;

use mimir_config::diagnostic::ConfigError;
use mimir_config::model::MimirConfig;
use mimir_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_mimir_config() {
    let toml = r#"
[log]
level = "debug"

[storage]
database_path = "/tmp/mimir-test.db"
wal_mode = false

[memory]
duplicate_threshold = 0.9
episodic_half_life_days = 7.0
knowledge_half_life_days = 90.0
candidate_limit = 10

[reranker]
min_score = 0.5
top_k = 5
max_tokens = 800

[extraction]
enabled = false
max_turns = 10

[pruning]
max_fact_age_days = 60
batch_size = 100
merge_duplicates = false

[router]
extra_episodic_markers = ["as we agreed"]
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/mimir-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.memory.duplicate_threshold, 0.9);
    assert_eq!(config.memory.episodic_half_life_days, Some(7.0));
    assert_eq!(config.memory.knowledge_half_life_days, Some(90.0));
    assert_eq!(config.memory.candidate_limit, 10);
    assert_eq!(config.reranker.min_score, 0.5);
    assert_eq!(config.reranker.top_k, 5);
    assert_eq!(config.reranker.max_tokens, 800);
    assert!(!config.extraction.enabled);
    assert_eq!(config.extraction.max_turns, 10);
    assert_eq!(config.pruning.max_fact_age_days, 60);
    assert_eq!(config.pruning.max_message_age_days, 30);
    assert_eq!(config.pruning.batch_size, 100);
    assert!(!config.pruning.merge_duplicates);
    assert_eq!(config.router.extra_episodic_markers, vec!["as we agreed"]);
}

/// Missing sections fall back to the documented defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML is valid");

    assert_eq!(config.memory.duplicate_threshold, 0.85);
    assert_eq!(config.memory.rrf_k, 60.0);
    assert_eq!(config.memory.episodic_half_life_days, Some(14.0));
    assert_eq!(config.memory.knowledge_half_life_days, None);
    assert_eq!(config.reranker.min_score, 0.6);
    assert_eq!(config.reranker.top_k, 3);
    assert_eq!(config.reranker.max_tokens, 500);
    assert_eq!(config.reranker.token_multiplier, 1.3);
    assert_eq!(config.extraction.max_turns, 20);
    assert_eq!(config.pruning.max_fact_age_days, 30);
    assert!(config.router.extra_knowledge_markers.is_empty());
}

/// Unknown field in a section is rejected.
#[test]
fn unknown_field_in_memory_produces_error() {
    let toml = r#"
[memory]
duplicate_treshold = 0.9
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("duplicate_treshold"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Diagnostics carry a suggestion and the section's valid keys.
#[test]
fn diagnostic_unknown_key_suggests_correction() {
    let toml = r#"
[reranker]
top_kk = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "top_kk"
                && suggestion.as_deref() == Some("top_k")
                && valid_keys.contains("max_tokens")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'top_kk' with suggestion 'top_k', got: {errors:?}"
    );
}

/// A string where a number is expected produces a type error.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[reranker]
top_k = "three"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("top_k"))),
        "expected InvalidType for top_k, got: {errors:?}"
    );
}

/// Semantic validation runs after successful deserialization.
#[test]
fn validation_catches_out_of_range_threshold() {
    let toml = r#"
[memory]
duplicate_threshold = 1.2

[reranker]
min_score = -0.1
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}

/// ConfigError renders through miette.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::Validation {
        message: "reranker.top_k must be at least 1".to_string(),
    };
    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error as &dyn Diagnostic)
        .expect("render");
    assert!(buf.contains("reranker.top_k must be at least 1"));
}

/// `MIMIR_*` env vars override file values with underscore-safe mapping.
#[test]
fn env_var_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "mimir.toml",
            r#"
[reranker]
top_k = 2

[memory]
duplicate_threshold = 0.8
"#,
        )?;
        jail.set_env("MIMIR_RERANKER_TOP_K", "5");
        jail.set_env("MIMIR_MEMORY_DUPLICATE_THRESHOLD", "0.95");

        let config: MimirConfig = load_config_from_path(Path::new("mimir.toml"))?;
        assert_eq!(config.reranker.top_k, 5);
        assert_eq!(config.memory.duplicate_threshold, 0.95);
        Ok(())
    });
}

/// A missing config file is not an error; defaults apply.
#[test]
fn missing_config_file_silently_skipped() {
    let config = load_config_from_path(Path::new("/nonexistent/mimir.toml"))
        .expect("missing file should fall back to defaults");
    assert_eq!(config.reranker.top_k, 3);
}
