// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign directory, start/stop commands and restart recovery.

use std::sync::Arc;

use dashmap::DashMap;
use outdial_core::types::{CallRecord, CampaignConfig};
use outdial_core::{CampaignState, OutdialError};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::campaign::{Campaign, CampaignDeps};
use crate::settings::CampaignSettings;
use crate::window::validate_restrictions;

/// Process-wide map of running campaigns keyed by campaign id.
#[derive(Clone, Default)]
pub struct CampaignDirectory {
    inner: Arc<DashMap<String, Campaign>>,
}

impl CampaignDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, campaign_id: &str) -> Option<Campaign> {
        self.inner.get(campaign_id).map(|entry| entry.value().clone())
    }

    pub(crate) fn insert(&self, campaign: Campaign) {
        self.inner.insert(campaign.id().to_string(), campaign);
    }

    pub(crate) fn remove(&self, campaign_id: &str) -> Option<Campaign> {
        self.inner.remove(campaign_id).map(|(_, campaign)| campaign)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn campaigns(&self) -> Vec<Campaign> {
        self.inner.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Outcome of restart recovery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub restarted: Vec<String>,
    pub failed: Vec<String>,
    /// Registry entries removed without restarting.
    pub cleared: Vec<String>,
}

/// Entry point for campaign commands.
pub struct Dialer {
    directory: CampaignDirectory,
    deps: CampaignDeps,
    settings: CampaignSettings,
    start_lock: Mutex<()>,
}

impl Dialer {
    pub fn new(deps: CampaignDeps, settings: CampaignSettings) -> Self {
        Self {
            directory: CampaignDirectory::new(),
            deps,
            settings,
            start_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &CampaignDirectory {
        &self.directory
    }

    pub fn deps(&self) -> &CampaignDeps {
        &self.deps
    }

    pub fn campaign(&self, campaign_id: &str) -> Option<Campaign> {
        self.directory.get(campaign_id)
    }

    /// Start a campaign, or refresh the credential and connection of a running one.
    pub async fn start(&self, config: CampaignConfig) -> Result<Campaign, OutdialError> {
        self.start_with(config, Vec::new()).await
    }

    async fn start_with(
        &self,
        config: CampaignConfig,
        restored_calls: Vec<CallRecord>,
    ) -> Result<Campaign, OutdialError> {
        let _guard = self.start_lock.lock().await;

        if let Some(existing) = self.directory.get(&config.campaign_id) {
            if existing.state() == CampaignState::Active {
                info!(campaign_id = %config.campaign_id, "campaign already running, refreshing connection");
                existing.refresh_and_rebuild().await?;
                return Ok(existing);
            }
            warn!(
                campaign_id = %config.campaign_id,
                state = %existing.state(),
                "campaign is stopping, start rejected"
            );
            return Err(OutdialError::Config(format!(
                "campaign {} is {}",
                config.campaign_id,
                existing.state()
            )));
        }

        validate_config(&config)?;

        let campaign_id = config.campaign_id.clone();
        let campaign = Campaign::new(
            config,
            restored_calls,
            self.deps.clone(),
            self.settings.clone(),
            self.directory.clone(),
        );
        if let Err(e) = campaign.initialize().await {
            error!(campaign_id = %campaign_id, error = %e, "campaign start failed");
            campaign.discard().await;
            self.deps.broadcast_all(Some(&campaign_id)).await;
            return Err(e);
        }

        self.directory.insert(campaign.clone());
        info!(campaign_id = %campaign_id, "campaign started");
        Ok(campaign)
    }

    /// Request a stop. Returns false when the campaign is not running here.
    pub async fn stop(&self, campaign_id: &str) -> bool {
        match self.directory.get(campaign_id) {
            Some(campaign) => {
                info!(campaign_id, "stop requested");
                campaign.request_stop().await;
                true
            }
            None => {
                warn!(campaign_id, "stop requested for unknown campaign");
                if let Err(e) = self.deps.registry.remove(campaign_id).await {
                    warn!(campaign_id, error = %e, "failed to remove registry entry");
                }
                self.deps.broadcast_all(Some(campaign_id)).await;
                false
            }
        }
    }

    /// Run the stop teardown immediately, regardless of live calls.
    pub async fn execute_complete_stop(&self, campaign_id: &str) -> bool {
        match self.directory.get(campaign_id) {
            Some(campaign) => {
                campaign.complete_stop().await;
                true
            }
            None => false,
        }
    }

    /// Restore campaigns after a process restart.
    ///
    /// With `auto_restart`, every active registry entry is restarted with its
    /// stored definition and calls in flight; other entries are removed.
    /// Without it, the registry and every queue are cleared.
    pub async fn recover(&self, auto_restart: bool) -> Result<RecoveryReport, OutdialError> {
        let mut report = RecoveryReport::default();
        let snapshots = self.deps.registry.list_all().await?;

        if !auto_restart {
            let cleared = self.deps.queue.clear_all().await?;
            for snapshot in snapshots {
                match self.deps.registry.remove(&snapshot.campaign_id).await {
                    Ok(()) => report.cleared.push(snapshot.campaign_id),
                    Err(e) => {
                        warn!(campaign_id = %snapshot.campaign_id, error = %e, "failed to remove stale campaign");
                        report.failed.push(snapshot.campaign_id);
                    }
                }
            }
            info!(
                campaigns = report.cleared.len(),
                queue_entries = cleared,
                "auto-recovery disabled, cleared previous state"
            );
            self.deps.broadcast_all(None).await;
            return Ok(report);
        }

        for snapshot in snapshots {
            let campaign_id = snapshot.campaign_id.clone();
            if let Err(e) = self.deps.queue.clear(&campaign_id).await {
                warn!(campaign_id = %campaign_id, error = %e, "failed to clear stale queue");
            }
            if snapshot.state != CampaignState::Active {
                match self.deps.registry.remove(&campaign_id).await {
                    Ok(()) => report.cleared.push(campaign_id),
                    Err(e) => {
                        warn!(campaign_id = %campaign_id, error = %e, "failed to remove inactive campaign");
                        report.failed.push(campaign_id);
                    }
                }
                continue;
            }
            let config = snapshot.config();
            match self.start_with(config, snapshot.current_calls).await {
                Ok(_) => report.restarted.push(campaign_id),
                Err(e) => {
                    error!(campaign_id = %campaign_id, error = %e, "campaign recovery failed");
                    report.failed.push(campaign_id);
                }
            }
        }
        info!(
            restarted = report.restarted.len(),
            failed = report.failed.len(),
            cleared = report.cleared.len(),
            "campaign recovery finished"
        );
        Ok(report)
    }

    /// Detach every campaign for process exit. Registry entries are kept for recovery.
    pub async fn shutdown(&self) {
        for campaign in self.directory.campaigns() {
            campaign.detach().await;
            self.directory.remove(campaign.id());
        }
        info!("dialer shut down");
    }
}

/// Reject definitions that can never run.
pub fn validate_config(config: &CampaignConfig) -> Result<(), OutdialError> {
    for (name, value) in [
        ("campaign_id", &config.campaign_id),
        ("call_flow_id", &config.call_flow_id),
        ("client_id", &config.client_id),
        ("client_secret", &config.client_secret),
    ] {
        if value.trim().is_empty() {
            return Err(OutdialError::Config(format!("{name} must not be empty")));
        }
    }
    validate_restrictions(&config.call_restrictions)
}

#[cfg(test)]
mod tests {
    use outdial_core::types::CallRestriction;

    use super::*;

    fn config() -> CampaignConfig {
        CampaignConfig {
            campaign_id: "p1".into(),
            call_flow_id: "f1".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            recurrence: None,
            call_restrictions: vec![],
        }
    }

    #[test]
    fn complete_config_is_valid() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn blank_secret_is_rejected() {
        let mut c = config();
        c.client_secret = " ".into();
        let err = validate_config(&c).unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn malformed_window_is_rejected() {
        let mut c = config();
        c.call_restrictions.push(CallRestriction {
            id: None,
            start_time: "25:00".into(),
            stop_time: "01:00".into(),
        });
        assert!(matches!(validate_config(&c), Err(OutdialError::Config(_))));
    }
}
