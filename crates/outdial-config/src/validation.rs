// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates constraints serde cannot express: URL syntax, timing ranges,
//! and the backoff factor.

use crate::diagnostic::ConfigError;
use crate::model::OutdialConfig;

/// Validate a deserialized configuration. Collects every error instead of failing fast.
pub fn validate_config(config: &OutdialConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    for (key, value) in [
        ("telephony.base_url", config.telephony.base_url.as_str()),
        ("records.base_url", config.records.base_url.as_str()),
        ("relay.primary_url", config.relay.primary_url.as_str()),
        ("relay.secondary_url", config.relay.secondary_url.as_str()),
    ] {
        check_url(&mut errors, key, value);
    }

    if !config.telephony.ws_path.starts_with('/') {
        errors.push(invalid(format!(
            "telephony.ws_path must start with `/`, got `{}`",
            config.telephony.ws_path
        )));
    }

    if config.telephony.heartbeat_interval_secs == 0 {
        errors.push(invalid("telephony.heartbeat_interval_secs must be positive"));
    }

    if config.relay.max_attempts == 0 {
        errors.push(invalid("relay.max_attempts must be at least 1"));
    }

    let dialer = &config.dialer;
    if !(dialer.idle_check_backoff_factor >= 1.0) {
        errors.push(invalid(format!(
            "dialer.idle_check_backoff_factor must be at least 1.0, got {}",
            dialer.idle_check_backoff_factor
        )));
    }
    if dialer.idle_check_min_ms == 0 {
        errors.push(invalid("dialer.idle_check_min_ms must be positive"));
    }
    if dialer.idle_check_min_ms > dialer.idle_check_max_ms {
        errors.push(invalid(format!(
            "dialer.idle_check_min_ms ({}) exceeds dialer.idle_check_max_ms ({})",
            dialer.idle_check_min_ms, dialer.idle_check_max_ms
        )));
    }
    if dialer.idle_jitter_min_ms > dialer.idle_jitter_max_ms {
        errors.push(invalid(format!(
            "dialer.idle_jitter_min_ms ({}) exceeds dialer.idle_jitter_max_ms ({})",
            dialer.idle_jitter_min_ms, dialer.idle_jitter_max_ms
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty"));
    }

    if config.gateway.bind_address.trim().is_empty() {
        errors.push(invalid("gateway.bind_address must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Endpoints that must be present before the dialer can serve traffic.
pub fn validate_endpoints(config: &OutdialConfig) -> Result<(), Vec<ConfigError>> {
    let errors: Vec<ConfigError> = [
        ("telephony.base_url", &config.telephony.base_url),
        ("records.base_url", &config.records.base_url),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(key, _)| ConfigError::MissingKey {
        key: key.to_string(),
    })
    .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    if value.trim().is_empty() {
        return;
    }
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(invalid(format!(
            "{key} must use http or https, got `{}`",
            parsed.scheme()
        ))),
        Err(e) => errors.push(invalid(format!("{key} `{value}` is not a valid URL: {e}"))),
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
