// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as thresholds within [0, 1] and non-zero budgets.

use crate::diagnostic::ConfigError;
use crate::model::MimirConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MimirConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log.level.to_lowercase().as_str()) {
        errors.push(validation(format!(
            "log.level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.log.level
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty".to_string()));
    }

    let memory = &config.memory;
    check_unit_interval(&mut errors, "memory.min_similarity", memory.min_similarity);
    check_unit_interval(&mut errors, "memory.decay_weight", memory.decay_weight);
    check_unit_interval(&mut errors, "memory.mmr_lambda", memory.mmr_lambda);
    check_unit_interval(
        &mut errors,
        "memory.duplicate_threshold",
        memory.duplicate_threshold,
    );
    check_unit_interval(
        &mut errors,
        "memory.lexical_duplicate_threshold",
        memory.lexical_duplicate_threshold,
    );
    if memory.mmr_lambda <= 0.0 {
        errors.push(validation(
            "memory.mmr_lambda must be greater than 0".to_string(),
        ));
    }
    if memory.rrf_k <= 0.0 {
        errors.push(validation(format!(
            "memory.rrf_k must be positive, got {}",
            memory.rrf_k
        )));
    }
    for (key, half_life) in [
        ("memory.episodic_half_life_days", memory.episodic_half_life_days),
        ("memory.knowledge_half_life_days", memory.knowledge_half_life_days),
    ] {
        if let Some(days) = half_life
            && days <= 0.0
        {
            errors.push(validation(format!("{key} must be positive, got {days}")));
        }
    }
    check_non_zero(&mut errors, "memory.max_content_chars", memory.max_content_chars);
    check_non_zero(&mut errors, "memory.candidate_limit", memory.candidate_limit);

    let reranker = &config.reranker;
    check_unit_interval(&mut errors, "reranker.min_score", reranker.min_score);
    check_non_zero(&mut errors, "reranker.top_k", reranker.top_k);
    check_non_zero(&mut errors, "reranker.max_tokens", reranker.max_tokens);
    if reranker.token_multiplier <= 0.0 {
        errors.push(validation(format!(
            "reranker.token_multiplier must be positive, got {}",
            reranker.token_multiplier
        )));
    }

    let extraction = &config.extraction;
    check_non_zero(&mut errors, "extraction.max_turns", extraction.max_turns);
    check_non_zero(&mut errors, "extraction.max_turn_chars", extraction.max_turn_chars);
    check_unit_interval(
        &mut errors,
        "extraction.default_confidence",
        extraction.default_confidence,
    );
    if extraction.enabled && extraction.model.trim().is_empty() {
        errors.push(validation(
            "extraction.model must not be empty when extraction is enabled".to_string(),
        ));
    }

    check_non_zero(&mut errors, "pruning.batch_size", config.pruning.batch_size);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

fn check_unit_interval(errors: &mut Vec<ConfigError>, key: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(validation(format!(
            "{key} must be between 0.0 and 1.0, got {value}"
        )));
    }
}

fn check_non_zero(errors: &mut Vec<ConfigError>, key: &str, value: usize) {
    if value == 0 {
        errors.push(validation(format!("{key} must be at least 1")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&MimirConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = MimirConfig::default();
        config.memory.duplicate_threshold = 1.5;
        config.reranker.top_k = 0;
        config.pruning.batch_size = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_non_positive_half_life() {
        let mut config = MimirConfig::default();
        config.memory.episodic_half_life_days = Some(0.0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0]
            .to_string()
            .contains("memory.episodic_half_life_days"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = MimirConfig::default();
        config.log.level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }
}
