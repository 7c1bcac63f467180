// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Outdial configuration system.

use outdial_config::diagnostic::ConfigError;
use outdial_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[service]
name = "dialer-a"
log_level = "debug"

[telephony]
base_url = "https://pbx.example.com"
heartbeat_interval_secs = 15
max_reconnect_attempts = 8

[records]
base_url = "https://crm.example.com/api"
api_key = "k-123"

[relay]
primary_url = "https://relay.example.com/9000"
secondary_url = "https://relay.example.com/dummy"
max_attempts = 4

[dialer]
idle_check_enabled = true
idle_check_backoff_factor = 2.0
auto_recover_on_restart = true

[storage]
database_path = "/tmp/outdial-test.db"
wal_mode = false

[gateway]
port = 4999
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.service.name, "dialer-a");
    assert_eq!(config.telephony.heartbeat_interval_secs, 15);
    assert_eq!(config.telephony.max_reconnect_attempts, 8);
    assert_eq!(config.telephony.reconnect_delay_secs, 3);
    assert_eq!(config.records.api_key.as_deref(), Some("k-123"));
    assert_eq!(config.relay.max_attempts, 4);
    assert_eq!(config.relay.retry_delay_ms, 2000);
    assert!(config.dialer.idle_check_enabled);
    assert!(config.dialer.auto_recover_on_restart);
    assert_eq!(config.dialer.idle_check_backoff_factor, 2.0);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.gateway.port, 4999);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("defaults");
    assert_eq!(config.service.name, "outdial");
    assert_eq!(config.gateway.port, 4020);
    assert_eq!(config.telephony.ws_path, "/callcontrol/ws");
    assert!(!config.dialer.idle_check_enabled);
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[dialer]
idle_chek_enabled = true
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("should produce UnknownKey");
    assert_eq!(unknown.0, "idle_chek_enabled");
    assert_eq!(unknown.1.as_deref(), Some("idle_check_enabled"));
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[gateway]
port = "not-a-port"
"#;

    let errors = load_and_validate_str(toml).expect_err("wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got: {errors:?}"
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[dialer]
idle_check_min_ms = 500000
idle_check_max_ms = 1000
"#;

    let errors = load_and_validate_str(toml).expect_err("min > max");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}
