// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./outdial.toml` > `~/.config/outdial/outdial.toml` > `/etc/outdial/outdial.toml`
//! with environment variable overrides via `OUTDIAL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::OutdialConfig;

/// Sections that environment keys are split on, in match order.
const ENV_SECTIONS: &[&str] = &[
    "service", "telephony", "records", "relay", "dialer", "storage", "gateway",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/outdial/outdial.toml`
/// 3. `~/.config/outdial/outdial.toml`
/// 4. `./outdial.toml`
/// 5. `OUTDIAL_*` environment variables
pub fn load_config() -> Result<OutdialConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<OutdialConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OutdialConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OutdialConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OutdialConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OutdialConfig::default()))
        .merge(Toml::file("/etc/outdial/outdial.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("outdial/outdial.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("outdial.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `OUTDIAL_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after the section name is a separator, so
/// `OUTDIAL_TELEPHONY_BASE_URL` maps to `telephony.base_url`.
fn env_provider() -> Env {
    Env::prefixed("OUTDIAL_").map(|key| section_key(&key.as_str().to_ascii_lowercase()).into())
}

fn section_key(key: &str) -> String {
    for section in ENV_SECTIONS {
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
    fn section_key_splits_once() {
        assert_eq!(section_key("telephony_base_url"), "telephony.base_url");
        assert_eq!(
            section_key("dialer_idle_check_min_ms"),
            "dialer.idle_check_min_ms"
        );
        assert_eq!(section_key("unrelated"), "unrelated");
    }

    #[test]
    fn uppercase_env_keys_map_to_sections() {
        let key = "GATEWAY_CLIENT_HEARTBEAT_SECS".to_ascii_lowercase();
        assert_eq!(section_key(&key), "gateway.client_heartbeat_secs");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("outdial.toml", "[gateway]\nport = 5000\n")?;
            jail.set_env("OUTDIAL_GATEWAY_PORT", "6000");
            jail.set_env("OUTDIAL_RELAY_MAX_ATTEMPTS", "5");
            let config = load_config()?;
            assert_eq!(config.gateway.port, 6000);
            assert_eq!(config.relay.max_attempts, 5);
            Ok(())
        });
    }
}
