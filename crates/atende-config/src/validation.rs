// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as positive intervals, well-formed endpoints, and unique product keywords.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::AtendeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AtendeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.agent.device.trim().is_empty() {
        fail("agent.device must not be empty".to_string());
    }

    for (key, value) in [
        ("engine.confirm_timeout_secs", config.engine.confirm_timeout_secs),
        ("echo.fingerprint_ttl_secs", config.echo.fingerprint_ttl_secs),
        ("provisioning.timeout_secs", config.provisioning.timeout_secs),
        ("followup.tick_interval_secs", config.followup.tick_interval_secs),
    ] {
        if value == 0 {
            fail(format!("{key} must be greater than zero"));
        }
    }

    for (key, list) in [
        ("engine.download_phrases", &config.engine.download_phrases),
        ("engine.screenshot_phrases", &config.engine.screenshot_phrases),
        ("engine.affirmative_words", &config.engine.affirmative_words),
        ("engine.negative_words", &config.engine.negative_words),
        ("engine.code_keywords", &config.engine.code_keywords),
        ("engine.playlist_keywords", &config.engine.playlist_keywords),
        ("engine.limit_markers", &config.engine.limit_markers),
    ] {
        if list.iter().any(|p| p.trim().is_empty()) {
            fail(format!("{key} must not contain empty entries"));
        }
    }

    if config.ocr.command.trim().is_empty() {
        fail("ocr.command must not be empty".to_string());
    }

    if let Some(endpoint) = &config.provisioning.endpoint {
        match url::Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => fail(format!(
                "provisioning.endpoint must use http or https, got `{}`",
                url.scheme()
            )),
            Err(e) => fail(format!("provisioning.endpoint `{endpoint}` is not a valid URL: {e}")),
        }
    }

    for host in &config.links.short_link_hosts {
        if host.trim().is_empty() || host.contains("://") || host.contains('/') {
            fail(format!(
                "links.short_link_hosts entry `{host}` must be a bare host name"
            ));
        }
    }

    if config.followup.enabled && config.followup.store_path.trim().is_empty() {
        fail("followup.store_path must not be empty when follow-ups are enabled".to_string());
    }

    let mut seen = HashSet::new();
    for (i, product) in config.products.iter().enumerate() {
        let keyword = product.keyword.as_str();
        if keyword.is_empty()
            || !keyword
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            fail(format!(
                "products[{i}].keyword `{keyword}` must be non-empty lowercase [a-z0-9_]"
            ));
        }
        if !seen.insert(keyword) {
            fail(format!("duplicate product keyword `{keyword}` in [[products]]"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductConfig;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    fn product(keyword: &str) -> ProductConfig {
        ProductConfig {
            keyword: keyword.to_string(),
            app_name: None,
            display_name: None,
            default_code: None,
            fallback_full_text: None,
            mode: None,
            reply_template: None,
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&AtendeConfig::default()).is_ok());
    }

    #[test]
    fn zero_intervals_fail_validation() {
        let mut config = AtendeConfig::default();
        config.engine.confirm_timeout_secs = 0;
        config.echo.fingerprint_ttl_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_error(&errors, "confirm_timeout_secs"));
        assert!(has_error(&errors, "fingerprint_ttl_secs"));
    }

    #[test]
    fn bad_endpoint_fails_validation() {
        let mut config = AtendeConfig::default();
        config.provisioning.endpoint = Some("ftp://upstream.local/trial".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "http or https"));

        config.provisioning.endpoint = Some("not a url".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "not a valid URL"));
    }

    #[test]
    fn short_link_hosts_must_be_bare() {
        let mut config = AtendeConfig::default();
        config.links.short_link_hosts = vec!["https://bit.ly".into()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "bare host name"));
    }

    #[test]
    fn duplicate_and_malformed_product_keywords() {
        let mut config = AtendeConfig::default();
        config.products = vec![product("ibo"), product("ibo"), product("Bad Key")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "duplicate product keyword `ibo`"));
        assert!(has_error(&errors, "`Bad Key`"));
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = AtendeConfig::default();
        config.agent.log_level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "agent.log_level"));
    }
}
