// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Outdial campaign dialer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Outdial configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutdialConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telephony control plane and protocol connection.
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Campaign-record service.
    #[serde(default)]
    pub records: RecordsConfig,

    /// Notification relay endpoints.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Dial-decision timing and idle polling.
    #[serde(default)]
    pub dialer: DialerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Command channel and dashboard broadcast.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "outdial".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telephony control-plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelephonyConfig {
    /// Base URL of the control plane REST API, e.g. `https://pbx.example.com`.
    #[serde(default)]
    pub base_url: String,

    /// Path of the event WebSocket, appended to `base_url` with a ws scheme.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Refresh the access token once its remaining validity drops below this.
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            ws_path: default_ws_path(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            token_refresh_margin_secs: default_token_refresh_margin_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TelephonyConfig {
    /// WebSocket URL derived from `base_url` and `ws_path`.
    pub fn ws_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}{}", self.ws_path)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn token_refresh_margin(&self) -> Duration {
        Duration::from_secs(self.token_refresh_margin_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_ws_path() -> String {
    "/callcontrol/ws".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_token_refresh_margin_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Campaign-record service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecordsConfig {
    #[serde(default)]
    pub base_url: String,

    /// Bearer key for the record service. `None` sends no Authorization header.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Notification relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Primary endpoint. Empty disables relaying.
    #[serde(default)]
    pub primary_url: String,

    /// Secondary endpoint, called only after a business-successful primary relay.
    #[serde(default)]
    pub secondary_url: String,

    #[serde(default = "default_relay_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_relay_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            primary_url: String::new(),
            secondary_url: String::new(),
            max_attempts: default_relay_max_attempts(),
            retry_delay_ms: default_relay_retry_delay_ms(),
        }
    }
}

impl RelayConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_relay_max_attempts() -> u32 {
    3
}

fn default_relay_retry_delay_ms() -> u64 {
    2000
}

/// Dial-decision timing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialerConfig {
    /// Run the self-rescheduling idle poller while a campaign is active.
    #[serde(default)]
    pub idle_check_enabled: bool,

    #[serde(default = "default_idle_check_min_ms")]
    pub idle_check_min_ms: u64,

    #[serde(default = "default_idle_check_max_ms")]
    pub idle_check_max_ms: u64,

    #[serde(default = "default_idle_check_backoff_factor")]
    pub idle_check_backoff_factor: f64,

    /// An extension is not re-dialed by the idle poller within this window of its last decision.
    #[serde(default = "default_extension_cooldown_ms")]
    pub extension_cooldown_ms: u64,

    #[serde(default = "default_idle_jitter_min_ms")]
    pub idle_jitter_min_ms: u64,

    #[serde(default = "default_idle_jitter_max_ms")]
    pub idle_jitter_max_ms: u64,

    #[serde(default = "default_inter_extension_delay_ms")]
    pub inter_extension_delay_ms: u64,

    /// Pause between creating a dial record and placing the call.
    #[serde(default = "default_pre_dial_delay_ms")]
    pub pre_dial_delay_ms: u64,

    /// Pause before teardown once a stopping campaign has no live calls.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    #[serde(default = "default_visit_record_delay_ms")]
    pub visit_record_delay_ms: u64,

    /// Restart campaigns that were active when the process last exited.
    #[serde(default)]
    pub auto_recover_on_restart: bool,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            idle_check_enabled: false,
            idle_check_min_ms: default_idle_check_min_ms(),
            idle_check_max_ms: default_idle_check_max_ms(),
            idle_check_backoff_factor: default_idle_check_backoff_factor(),
            extension_cooldown_ms: default_extension_cooldown_ms(),
            idle_jitter_min_ms: default_idle_jitter_min_ms(),
            idle_jitter_max_ms: default_idle_jitter_max_ms(),
            inter_extension_delay_ms: default_inter_extension_delay_ms(),
            pre_dial_delay_ms: default_pre_dial_delay_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            visit_record_delay_ms: default_visit_record_delay_ms(),
            auto_recover_on_restart: false,
        }
    }
}

impl DialerConfig {
    pub fn idle_check_min(&self) -> Duration {
        Duration::from_millis(self.idle_check_min_ms)
    }

    pub fn idle_check_max(&self) -> Duration {
        Duration::from_millis(self.idle_check_max_ms)
    }

    pub fn extension_cooldown(&self) -> Duration {
        Duration::from_millis(self.extension_cooldown_ms)
    }

    pub fn inter_extension_delay(&self) -> Duration {
        Duration::from_millis(self.inter_extension_delay_ms)
    }

    pub fn pre_dial_delay(&self) -> Duration {
        Duration::from_millis(self.pre_dial_delay_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn visit_record_delay(&self) -> Duration {
        Duration::from_millis(self.visit_record_delay_ms)
    }
}

fn default_idle_check_min_ms() -> u64 {
    30_000
}

fn default_idle_check_max_ms() -> u64 {
    300_000
}

fn default_idle_check_backoff_factor() -> f64 {
    1.5
}

fn default_extension_cooldown_ms() -> u64 {
    60_000
}

fn default_idle_jitter_min_ms() -> u64 {
    4_000
}

fn default_idle_jitter_max_ms() -> u64 {
    6_000
}

fn default_inter_extension_delay_ms() -> u64 {
    1_000
}

fn default_pre_dial_delay_ms() -> u64 {
    2_000
}

fn default_stop_grace_ms() -> u64 {
    1_000
}

fn default_visit_record_delay_ms() -> u64 {
    100
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("outdial").join("outdial.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("outdial.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Command channel and broadcast configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Interval between server pings to dashboard clients.
    #[serde(default = "default_client_heartbeat_secs")]
    pub client_heartbeat_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            bind_address: default_bind_address(),
            port: default_gateway_port(),
            client_heartbeat_secs: default_client_heartbeat_secs(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    4020
}

fn default_client_heartbeat_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_swaps_scheme() {
        let config = TelephonyConfig {
            base_url: "https://pbx.example.com/".into(),
            ..Default::default()
        };
        assert_eq!(config.ws_url(), "wss://pbx.example.com/callcontrol/ws");

        let config = TelephonyConfig {
            base_url: "http://127.0.0.1:5000".into(),
            ..Default::default()
        };
        assert_eq!(config.ws_url(), "ws://127.0.0.1:5000/callcontrol/ws");
    }

    #[test]
    fn dialer_defaults() {
        let dialer = DialerConfig::default();
        assert!(!dialer.idle_check_enabled);
        assert_eq!(dialer.idle_check_min(), Duration::from_secs(30));
        assert_eq!(dialer.idle_check_max(), Duration::from_secs(300));
        assert_eq!(dialer.pre_dial_delay(), Duration::from_secs(2));
        assert_eq!(dialer.extension_cooldown(), Duration::from_secs(60));
    }
}
