// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared harness for campaign scenario tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use outdial_campaign::queue::Replenisher;
use outdial_campaign::{CampaignDeps, CampaignSettings, Dialer};
use outdial_core::types::{Candidate, CandidateStatus, CampaignConfig, Extension};
use outdial_test_utils::{
    MemoryQueue, MemoryRegistry, MockConnector, MockControlPlane, MockRecordService, MockRelay,
    PlacedCall, PrimaryBehavior, RecordingBroadcast, wait_for,
};

pub const CAMPAIGN: &str = "camp-1";
pub const WAIT: Duration = Duration::from_secs(5);

pub struct TestHarness {
    pub control: Arc<MockControlPlane>,
    pub records: Arc<MockRecordService>,
    pub relay: Arc<MockRelay>,
    pub registry: Arc<MemoryRegistry>,
    pub broadcast: Arc<RecordingBroadcast>,
    pub queue: Arc<MemoryQueue>,
    pub connector: Arc<MockConnector>,
    pub dialer: Dialer,
}

pub struct TestHarnessBuilder {
    roster: Vec<Extension>,
    pending: Vec<Candidate>,
    failed: Vec<Candidate>,
    relay: MockRelay,
    settings: CampaignSettings,
    token_lifetime_secs: u64,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder {
            roster: Vec::new(),
            pending: Vec::new(),
            failed: Vec::new(),
            relay: MockRelay::new(PrimaryBehavior::Accept),
            settings: CampaignSettings::immediate(),
            token_lifetime_secs: 3600,
        }
    }

    /// A `start` command with no schedule and no restricted windows.
    pub fn config(&self) -> CampaignConfig {
        campaign_config(CAMPAIGN)
    }

    /// Top up the campaign queue the way a connection open does.
    pub async fn fill_queue(&self, agent_count: usize) -> usize {
        Replenisher {
            queue: self.queue.as_ref(),
            records: self.records.as_ref(),
        }
        .replenish(CAMPAIGN, "flow-1", agent_count)
        .await
        .unwrap()
    }

    /// Wait until at least `count` calls were placed and return them all.
    pub async fn wait_placed(&self, count: usize) -> Vec<PlacedCall> {
        let control = self.control.clone();
        wait_for(WAIT, || {
            let control = control.clone();
            async move { control.placed_calls().await.len() >= count }
        })
        .await;
        self.control.placed_calls().await
    }
}

/// Poll a synchronous condition every 10ms, panicking after [`WAIT`].
pub async fn until(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {WAIT:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn campaign_config(campaign_id: &str) -> CampaignConfig {
    CampaignConfig {
        campaign_id: campaign_id.to_string(),
        call_flow_id: "flow-1".into(),
        client_id: "client".into(),
        client_secret: "secret".into(),
        recurrence: None,
        call_restrictions: vec![],
    }
}

impl TestHarnessBuilder {
    pub fn roster(mut self, roster: Vec<Extension>) -> Self {
        self.roster = roster;
        self
    }

    pub fn pending(mut self, candidates: Vec<Candidate>) -> Self {
        self.pending = candidates;
        self
    }

    pub fn failed(mut self, candidates: Vec<Candidate>) -> Self {
        self.failed = candidates;
        self
    }

    pub fn relay(mut self, relay: MockRelay) -> Self {
        self.relay = relay;
        self
    }

    pub fn settings(mut self, settings: CampaignSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn token_lifetime(mut self, secs: u64) -> Self {
        self.token_lifetime_secs = secs;
        self
    }

    pub async fn build(self) -> TestHarness {
        let control = MockControlPlane::new(self.roster)
            .with_token_lifetime(self.token_lifetime_secs)
            .shared();
        let records = Arc::new(MockRecordService::new());
        records
            .set_candidates(CandidateStatus::Pending, self.pending)
            .await;
        records
            .set_candidates(CandidateStatus::Failed, self.failed)
            .await;
        let relay = Arc::new(self.relay);
        let registry = Arc::new(MemoryRegistry::new());
        let broadcast = Arc::new(RecordingBroadcast::new());
        let queue = Arc::new(MemoryQueue::new());
        let connector = Arc::new(MockConnector::new());

        let deps = CampaignDeps {
            control_plane: control.clone(),
            records: records.clone(),
            relay: relay.clone(),
            registry: registry.clone(),
            broadcast: broadcast.clone(),
            queue: queue.clone(),
            connector: connector.clone(),
        };

        TestHarness {
            control,
            records,
            relay,
            registry,
            broadcast,
            queue,
            connector,
            dialer: Dialer::new(deps, self.settings),
        }
    }
}
