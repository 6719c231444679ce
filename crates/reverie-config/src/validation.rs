// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All errors are
//! collected; validation never stops at the first failure.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ReverieConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Minimum thinking budget accepted by the Anthropic API.
const MIN_THINKING_BUDGET: u32 = 1024;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &ReverieConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.to_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    validate_provider(config, &mut errors);

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if !(0.0..=1.0).contains(&config.context.similarity_threshold) {
        errors.push(ConfigError::validation(format!(
            "context.similarity_threshold must be between 0.0 and 1.0, got {}",
            config.context.similarity_threshold
        )));
    }

    if config.memory.dimension == 0 {
        errors.push(ConfigError::validation("memory.dimension must be positive"));
    }

    if config.memory.narrative_interval == 0 {
        errors.push(ConfigError::validation(
            "memory.narrative_interval must be at least 1",
        ));
    }

    if !is_http_url(&config.memory.embedding_endpoint) {
        errors.push(ConfigError::validation(format!(
            "memory.embedding_endpoint `{}` must start with http:// or https://",
            config.memory.embedding_endpoint
        )));
    }

    let host = config.gateway.host.trim();
    let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
    if !is_valid_ip && !is_valid_hostname {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    let mut seen_ids = HashSet::new();
    for (i, journey) in config.journeys.iter().enumerate() {
        let id = journey.id.trim();
        let named = (!id.is_empty()).then_some(id);
        if id.is_empty() {
            errors.push(ConfigError::journey(i, None, "`id` must not be empty"));
        } else if !seen_ids.insert(id) {
            errors.push(ConfigError::journey(i, named, "duplicate journey id"));
        }
        if journey.system_prompt.trim().is_empty() {
            errors.push(ConfigError::journey(
                i,
                named,
                "`system_prompt` must not be empty",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_provider(config: &ReverieConfig, errors: &mut Vec<ConfigError>) {
    let provider = &config.provider;

    if provider.max_tokens == 0 {
        errors.push(ConfigError::validation("provider.max_tokens must be positive"));
    }

    if let Some(temperature) = provider.temperature
        && !(0.0..=2.0).contains(&temperature)
    {
        errors.push(ConfigError::validation(format!(
            "provider.temperature must be between 0.0 and 2.0, got {temperature}"
        )));
    }

    if let Some(budget) = provider.anthropic.thinking_budget_tokens
        && budget < MIN_THINKING_BUDGET
    {
        errors.push(ConfigError::validation(format!(
            "provider.anthropic.thinking_budget_tokens must be at least {MIN_THINKING_BUDGET}, got {budget}"
        )));
    }

    if !is_http_url(&provider.ollama.endpoint) {
        errors.push(ConfigError::validation(format!(
            "provider.ollama.endpoint `{}` must start with http:// or https://",
            provider.ollama.endpoint
        )));
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JourneyConfig;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&ReverieConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ReverieConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn small_thinking_budget_fails_validation() {
        let mut config = ReverieConfig::default();
        config.provider.anthropic.thinking_budget_tokens = Some(100);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "thinking_budget_tokens"));
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = ReverieConfig::default();
        config.context.similarity_threshold = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "similarity_threshold"));
    }

    #[test]
    fn non_http_endpoint_fails_validation() {
        let mut config = ReverieConfig::default();
        config.provider.ollama.endpoint = "localhost:11434".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "provider.ollama.endpoint"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ReverieConfig::default();
        config.agent.log_level = "loud".to_string();
        config.memory.narrative_interval = 0;
        config.provider.max_tokens = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn duplicate_journey_ids_fail_validation() {
        let journey = JourneyConfig {
            id: "values".to_string(),
            title: "Discover your values".to_string(),
            description: String::new(),
            system_prompt: "Guide the user".to_string(),
        };
        let mut config = ReverieConfig::default();
        config.journeys = vec![journey.clone(), journey];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigError::Journey { index: Some(1), id: Some(id), message }
                if id == "values" && message.contains("duplicate")
        ));
    }

    #[test]
    fn blank_journey_prompt_names_the_entry() {
        let mut config = ReverieConfig::default();
        config.journeys = vec![JourneyConfig {
            id: " ".to_string(),
            title: "Untitled".to_string(),
            description: String::new(),
            system_prompt: String::new(),
        }];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(
            e,
            ConfigError::Journey { index: Some(0), id: None, .. }
        )));
    }
}
