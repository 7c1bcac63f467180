// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timing knobs shared by every campaign.

use std::time::Duration;

use outdial_config::model::OutdialConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignSettings {
    pub idle_check_enabled: bool,
    pub idle_check_min: Duration,
    pub idle_check_max: Duration,
    pub idle_check_backoff_factor: f64,
    pub extension_cooldown: Duration,
    pub idle_jitter_min: Duration,
    pub idle_jitter_max: Duration,
    pub inter_extension_delay: Duration,
    pub pre_dial_delay: Duration,
    pub stop_grace: Duration,
    pub visit_record_delay: Duration,
    pub relay_max_attempts: u32,
    pub relay_retry_delay: Duration,
    pub token_refresh_margin: Duration,
}

impl CampaignSettings {
    pub fn from_config(config: &OutdialConfig) -> Self {
        let dialer = &config.dialer;
        Self {
            idle_check_enabled: dialer.idle_check_enabled,
            idle_check_min: dialer.idle_check_min(),
            idle_check_max: dialer.idle_check_max(),
            idle_check_backoff_factor: dialer.idle_check_backoff_factor,
            extension_cooldown: dialer.extension_cooldown(),
            idle_jitter_min: Duration::from_millis(dialer.idle_jitter_min_ms),
            idle_jitter_max: Duration::from_millis(dialer.idle_jitter_max_ms),
            inter_extension_delay: dialer.inter_extension_delay(),
            pre_dial_delay: dialer.pre_dial_delay(),
            stop_grace: dialer.stop_grace(),
            visit_record_delay: dialer.visit_record_delay(),
            relay_max_attempts: config.relay.max_attempts.max(1),
            relay_retry_delay: config.relay.retry_delay(),
            token_refresh_margin: config.telephony.token_refresh_margin(),
        }
    }

    /// All delays zeroed and the idle poller off. Used by tests.
    pub fn immediate() -> Self {
        Self {
            idle_check_enabled: false,
            idle_check_min: Duration::from_millis(10),
            idle_check_max: Duration::from_millis(100),
            idle_check_backoff_factor: 1.5,
            extension_cooldown: Duration::ZERO,
            idle_jitter_min: Duration::ZERO,
            idle_jitter_max: Duration::ZERO,
            inter_extension_delay: Duration::ZERO,
            pre_dial_delay: Duration::ZERO,
            stop_grace: Duration::ZERO,
            visit_record_delay: Duration::ZERO,
            relay_max_attempts: 3,
            relay_retry_delay: Duration::ZERO,
            token_refresh_margin: Duration::from_secs(300),
        }
    }
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self::from_config(&OutdialConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config_defaults() {
        let s = CampaignSettings::default();
        assert!(!s.idle_check_enabled);
        assert_eq!(s.idle_check_min, Duration::from_secs(30));
        assert_eq!(s.idle_check_max, Duration::from_secs(300));
        assert_eq!(s.pre_dial_delay, Duration::from_secs(2));
        assert_eq!(s.relay_max_attempts, 3);
        assert_eq!(s.relay_retry_delay, Duration::from_secs(2));
    }
}
