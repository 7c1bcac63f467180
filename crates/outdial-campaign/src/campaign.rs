// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-campaign orchestrator.
//!
//! A [`Campaign`] owns its roster, call ledger and advisory slots behind one
//! mutex; every decision cycle holds that mutex from start to finish, so at
//! most one cycle runs per campaign. Protocol frames never run a cycle
//! directly: the frame handler captures what it needs, enqueues a
//! [`DialTrigger`] and returns, and a single worker task drains the trigger
//! queue in order.
//!
//! Connection rebuilds and the jittered idle trigger run outside the mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outdial_core::types::{
    Advisory, CallRecord, CampaignConfig, CampaignField, CampaignSnapshot, Extension,
    OutcomeCode, Participant, ProtocolEvent, VisitRecord,
};
use outdial_core::{
    BroadcastSink, CallQueueStore, CallStatus, CampaignRegistry, CampaignState, ControlPlane,
    FrameHandler, NotificationRelay, OutdialError, ProtocolConnector, ProtocolLink, RecordService,
};
use outdial_telephony::CredentialManager;
use secrecy::SecretString;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::idle::{IdleBackoff, has_ready_extension, jitter, run_idle_poller};
use crate::ledger::CallLedger;
use crate::lifecycle::CampaignDirectory;
use crate::queue::Replenisher;
use crate::schedule::Recurrence;
use crate::settings::CampaignSettings;
use crate::single_flight::SingleFlight;
use crate::window::blocking_restriction;

const VISIT_TYPE: &str = "intro";
const VISITED_BY: &str = "admin";
const VISIT_TITLE: &str = "Outbound call connected";

/// External collaborators shared by every campaign.
#[derive(Clone)]
pub struct CampaignDeps {
    pub control_plane: Arc<dyn ControlPlane>,
    pub records: Arc<dyn RecordService>,
    pub relay: Arc<dyn NotificationRelay>,
    pub registry: Arc<dyn CampaignRegistry>,
    pub broadcast: Arc<dyn BroadcastSink>,
    pub queue: Arc<dyn CallQueueStore>,
    pub connector: Arc<dyn ProtocolConnector>,
}

impl CampaignDeps {
    /// Publish every registry snapshot, noting which campaign changed.
    pub async fn broadcast_all(&self, changed: Option<&str>) {
        match self.registry.list_all().await {
            Ok(snapshots) => {
                if let Err(e) = self.broadcast.publish(&snapshots, changed).await {
                    warn!(error = %e, "campaign broadcast failed");
                }
            }
            Err(e) => warn!(error = %e, "failed to list campaigns for broadcast"),
        }
    }
}

/// Participant state captured when an event arrives, before the cycle lock.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantSnapshot {
    Present(Participant),
    Absent,
    /// The lookup failed or no credential was available.
    NotCaptured,
}

/// How a decision cycle picks extensions to dial.
#[derive(Debug, Clone)]
pub enum DialMode {
    /// Walk the whole roster.
    Initial,
    /// React to one event on one extension.
    Single {
        event: ProtocolEvent,
        snapshot: ParticipantSnapshot,
    },
}

/// Work items for the campaign's decision worker.
pub(crate) enum DialTrigger {
    /// The protocol connection (re)opened.
    Opened,
    /// Idle poller found a ready extension.
    Initial,
    Event {
        event: ProtocolEvent,
        snapshot: JoinHandle<ParticipantSnapshot>,
    },
    ConnectionLost(String),
}

/// Roster state readable without the cycle lock.
#[derive(Debug, Default)]
struct RosterView {
    agents: Vec<Extension>,
    last_execution: HashMap<String, DateTime<Utc>>,
}

/// Everything guarded by the cycle lock.
struct CampaignData {
    config: CampaignConfig,
    agents: Vec<Extension>,
    advisory: Advisory,
    ledger: CallLedger,
    last_execution: HashMap<String, DateTime<Utc>>,
}

struct Shared {
    id: String,
    settings: CampaignSettings,
    deps: CampaignDeps,
    credentials: CredentialManager,
    directory: CampaignDirectory,
    state: watch::Sender<CampaignState>,
    data: Mutex<CampaignData>,
    view: ArcSwap<RosterView>,
    link: Mutex<Option<Box<dyn ProtocolLink>>>,
    rebuild: SingleFlight,
    triggers: mpsc::UnboundedSender<DialTrigger>,
    cancel: CancellationToken,
    idle: Mutex<Option<CancellationToken>>,
    stop_done: AtomicBool,
}

/// Handle to one running campaign. Cheap to clone.
#[derive(Clone)]
pub struct Campaign {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Campaign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Campaign")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Campaign {
    /// Build the campaign and spawn its decision worker. Nothing is contacted yet.
    pub(crate) fn new(
        config: CampaignConfig,
        restored_calls: Vec<CallRecord>,
        deps: CampaignDeps,
        settings: CampaignSettings,
        directory: CampaignDirectory,
    ) -> Self {
        let credentials = CredentialManager::new(
            Arc::clone(&deps.control_plane),
            config.client_id.clone(),
            SecretString::from(config.client_secret.clone()),
            settings.token_refresh_margin,
        );
        let (triggers, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(CampaignState::Active);
        let cancel = CancellationToken::new();

        let shared = Arc::new(Shared {
            id: config.campaign_id.clone(),
            settings,
            deps,
            credentials,
            directory,
            state,
            data: Mutex::new(CampaignData {
                config,
                agents: Vec::new(),
                advisory: Advisory::default(),
                ledger: CallLedger::from_current(restored_calls),
                last_execution: HashMap::new(),
            }),
            view: ArcSwap::from_pointee(RosterView::default()),
            link: Mutex::new(None),
            rebuild: SingleFlight::new(),
            triggers,
            cancel: cancel.clone(),
            idle: Mutex::new(None),
            stop_done: AtomicBool::new(false),
        });

        tokio::spawn(run_worker(Arc::downgrade(&shared), rx, cancel));
        Self { shared }
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn state(&self) -> CampaignState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CampaignState> {
        self.shared.state.subscribe()
    }

    pub async fn is_connected(&self) -> bool {
        self.shared
            .link
            .lock()
            .await
            .as_ref()
            .is_some_and(|link| link.is_connected())
    }

    /// Whether the last roster refresh showed any live participant.
    pub fn has_live_calls(&self) -> bool {
        self.shared.view.load().agents.iter().any(|e| !e.is_idle())
    }

    pub async fn advisory(&self) -> Advisory {
        self.shared.data.lock().await.advisory.clone()
    }

    pub async fn current_calls(&self) -> Vec<CallRecord> {
        self.shared.data.lock().await.ledger.current_records()
    }

    pub async fn snapshot(&self) -> CampaignSnapshot {
        let data = self.shared.data.lock().await;
        self.snapshot_of(&data)
    }

    fn snapshot_of(&self, data: &CampaignData) -> CampaignSnapshot {
        CampaignSnapshot {
            campaign_id: self.shared.id.clone(),
            call_flow_id: data.config.call_flow_id.clone(),
            client_id: data.config.client_id.clone(),
            client_secret: data.config.client_secret.clone(),
            state: self.state(),
            agents: data.agents.clone(),
            advisory: data.advisory.clone(),
            recurrence: data.config.recurrence.clone(),
            call_restrictions: data.config.call_restrictions.clone(),
            access_token: self.shared.credentials.access_token(),
            current_calls: data.ledger.current_records(),
            last_execution: data.last_execution.clone(),
            updated_at: Utc::now(),
        }
    }

    // --- startup -----------------------------------------------------------

    /// Issue the first credential, load the roster, register the snapshot and connect.
    pub(crate) async fn initialize(&self) -> Result<(), OutdialError> {
        let token = self.shared.credentials.force_refresh().await?;
        let agents = self.shared.deps.control_plane.list_extensions(&token).await?;
        info!(
            campaign_id = %self.shared.id,
            agents = agents.len(),
            "campaign roster loaded"
        );

        let snapshot = {
            let mut data = self.shared.data.lock().await;
            data.agents = agents;
            self.refresh_view(&data);
            self.snapshot_of(&data)
        };
        self.shared.deps.registry.save(&snapshot).await?;
        self.rebuild_connection().await?;
        self.shared.deps.broadcast_all(Some(&self.shared.id)).await;
        Ok(())
    }

    /// Undo a failed start: stop the worker, close any link, drop the registry entry.
    pub(crate) async fn discard(&self) {
        self.shared.stop_done.store(true, Ordering::Release);
        self.shared.cancel.cancel();
        self.disconnect().await;
        if let Err(e) = self.shared.deps.registry.remove(&self.shared.id).await {
            warn!(campaign_id = %self.shared.id, error = %e, "failed to remove discarded campaign");
        }
        self.shared.state.send_replace(CampaignState::Stopped);
    }

    /// Force a new credential and rebuild the connection with it.
    pub async fn refresh_and_rebuild(&self) -> Result<(), OutdialError> {
        self.shared.credentials.force_refresh().await?;
        self.persist(CampaignField::AccessToken(self.shared.credentials.access_token()))
            .await;
        self.rebuild_connection().await
    }

    // --- connection --------------------------------------------------------

    /// Tear down the current link and connect again with the current credential.
    pub async fn rebuild_connection(&self) -> Result<(), OutdialError> {
        let token = self
            .shared
            .credentials
            .access_token()
            .ok_or_else(|| OutdialError::Credential("no access token to connect with".into()))?;

        let mut link = self.shared.link.lock().await;
        if let Some(old) = link.take() {
            old.disconnect().await;
        }
        if self.state() == CampaignState::Stopped {
            return Ok(());
        }
        let handler: Arc<dyn FrameHandler> = Arc::new(CampaignHandler {
            campaign: Arc::downgrade(&self.shared),
        });
        *link = Some(self.shared.deps.connector.connect(&token, handler).await?);
        info!(campaign_id = %self.shared.id, "protocol connection established");
        Ok(())
    }

    /// Rebuild the connection in the background, at most one rebuild at a time.
    fn schedule_rebuild(&self) {
        let Some(guard) = self.shared.rebuild.try_acquire() else {
            debug!(campaign_id = %self.shared.id, "connection rebuild already in flight");
            return;
        };
        let campaign = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = campaign.rebuild_connection().await {
                warn!(campaign_id = %campaign.shared.id, error = %e, "connection rebuild failed");
                campaign
                    .set_advisory(|a| a.error = Some(format!("connection rebuild failed: {e}")))
                    .await;
            }
        });
    }

    async fn disconnect(&self) {
        if let Some(link) = self.shared.link.lock().await.take() {
            link.disconnect().await;
        }
    }

    // --- triggers ----------------------------------------------------------

    fn enqueue(&self, trigger: DialTrigger) {
        if self.shared.triggers.send(trigger).is_err() {
            debug!(campaign_id = %self.shared.id, "decision worker gone, trigger dropped");
        }
    }

    /// Look the event's participant up now, so a later cycle sees its state at arrival.
    fn capture_participant(&self, event: &ProtocolEvent) -> JoinHandle<ParticipantSnapshot> {
        let control_plane = Arc::clone(&self.shared.deps.control_plane);
        let token = self.shared.credentials.access_token();
        let entity = event.entity.clone();
        tokio::spawn(async move {
            let Some(token) = token else {
                return ParticipantSnapshot::NotCaptured;
            };
            match control_plane.get_participant(&token, &entity).await {
                Ok(Some(participant)) => ParticipantSnapshot::Present(participant),
                Ok(None) => ParticipantSnapshot::Absent,
                Err(e) => {
                    debug!(entity = %entity, error = %e, "participant capture failed");
                    ParticipantSnapshot::NotCaptured
                }
            }
        })
    }

    async fn handle_trigger(&self, trigger: DialTrigger) {
        match trigger {
            DialTrigger::Opened => {
                if self.state() != CampaignState::Active {
                    return;
                }
                self.replenish_logged().await;
                self.start_idle_poller().await;
                self.run_cycle(DialMode::Initial).await;
            }
            DialTrigger::Initial => self.run_cycle(DialMode::Initial).await,
            DialTrigger::Event { event, snapshot } => {
                let snapshot = snapshot.await.unwrap_or(ParticipantSnapshot::NotCaptured);
                match self.state() {
                    CampaignState::Active => {
                        self.run_cycle(DialMode::Single { event, snapshot }).await;
                    }
                    CampaignState::Stopping => self.drain_step().await,
                    CampaignState::Stopped => {}
                }
            }
            DialTrigger::ConnectionLost(message) => {
                error!(campaign_id = %self.shared.id, message = %message, "protocol connection lost");
                self.set_advisory(|a| a.error = Some(format!("connection lost: {message}")))
                    .await;
            }
        }
    }

    async fn replenish_logged(&self) {
        let (call_flow_id, agent_count) = {
            let data = self.shared.data.lock().await;
            (data.config.call_flow_id.clone(), data.agents.len())
        };
        let replenisher = Replenisher {
            queue: self.shared.deps.queue.as_ref(),
            records: self.shared.deps.records.as_ref(),
        };
        if let Err(e) = replenisher
            .replenish(&self.shared.id, &call_flow_id, agent_count)
            .await
        {
            warn!(campaign_id = %self.shared.id, error = %e, "call queue replenish failed");
        }
    }

    // --- decision cycle ----------------------------------------------------

    /// Run one decision cycle. Errors land in the advisory slot and never escape.
    pub async fn run_cycle(&self, mode: DialMode) {
        let started = Instant::now();
        let mut data = self.shared.data.lock().await;
        data.advisory.clear();

        if self.state() != CampaignState::Active {
            debug!(campaign_id = %self.shared.id, state = %self.state(), "cycle skipped");
            return;
        }

        if let Err(e) = self.cycle(&mut data, mode).await {
            warn!(
                campaign_id = %self.shared.id,
                error = %e,
                category = %e.category(),
                "decision cycle failed"
            );
            data.advisory.error = Some(e.to_string());
        }

        self.persist(CampaignField::Advisory(data.advisory.clone()))
            .await;
        self.refresh_view(&data);
        drop(data);
        self.shared.deps.broadcast_all(Some(&self.shared.id)).await;
        debug!(
            campaign_id = %self.shared.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "decision cycle finished"
        );
    }

    async fn cycle(&self, data: &mut CampaignData, mode: DialMode) -> Result<(), OutdialError> {
        if self.shared.credentials.check_and_refresh().await? {
            info!(campaign_id = %self.shared.id, "access token rotated, rebuilding connection");
            self.persist(CampaignField::AccessToken(self.shared.credentials.access_token()))
                .await;
            self.schedule_rebuild();
        }
        let token = self
            .shared
            .credentials
            .access_token()
            .ok_or_else(|| OutdialError::Credential("no valid access token".into()))?;

        self.refresh_roster(data, &token).await?;
        self.shared.deps.broadcast_all(Some(&self.shared.id)).await;

        if data.agents.is_empty() {
            warn!(campaign_id = %self.shared.id, "campaign has no extensions");
            data.advisory.warning = Some("campaign has no extensions".into());
            return Ok(());
        }
        if let Some(reason) = gate_block(&data.config, Utc::now()) {
            warn!(campaign_id = %self.shared.id, reason = %reason, "dialing gated");
            data.advisory.warning = Some(reason);
            return Ok(());
        }

        match mode {
            DialMode::Initial => self.dial_initial(data, &token).await,
            DialMode::Single { event, snapshot } => {
                self.dial_single(data, &token, &event, snapshot).await
            }
        }
    }

    /// Replace the roster and sync `current` record statuses with live participants.
    async fn refresh_roster(
        &self,
        data: &mut CampaignData,
        token: &str,
    ) -> Result<(), OutdialError> {
        data.agents = self.shared.deps.control_plane.list_extensions(token).await?;

        let mut changed = false;
        for ext in &data.agents {
            if let Some(participant) = ext.live_participant() {
                if data.ledger.update_status(&ext.dn, participant.status) {
                    debug!(dn = %ext.dn, status = %participant.status, "call record status updated");
                    changed = true;
                }
            }
        }

        self.persist(CampaignField::Agents(data.agents.clone())).await;
        if changed {
            self.persist(CampaignField::CurrentCalls(data.ledger.current_records()))
                .await;
        }
        self.refresh_view(data);
        Ok(())
    }

    async fn dial_initial(&self, data: &mut CampaignData, token: &str) -> Result<(), OutdialError> {
        let roster = data.agents.clone();
        let last_index = roster.len().saturating_sub(1);

        for (index, ext) in roster.iter().enumerate() {
            if self.state() != CampaignState::Active {
                info!(campaign_id = %self.shared.id, "campaign left active state, ending initial pass");
                break;
            }
            if !ext.is_idle() {
                debug!(dn = %ext.dn, "extension busy, skipping");
                continue;
            }
            match self.shared.deps.control_plane.agent_profile(token, &ext.dn).await {
                Ok(profile) if profile.is_available() => {}
                Ok(profile) => {
                    debug!(dn = %ext.dn, profile = ?profile.current_profile_name, "agent unavailable, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(dn = %ext.dn, error = %e, "agent profile lookup failed, skipping");
                    continue;
                }
            }

            if let Err(e) = self.dial_extension(data, token, ext).await {
                warn!(campaign_id = %self.shared.id, dn = %ext.dn, error = %e, "dial failed");
                data.advisory.error = Some(e.to_string());
            }

            if index < last_index && !self.shared.settings.inter_extension_delay.is_zero() {
                tokio::time::sleep(self.shared.settings.inter_extension_delay).await;
            }
        }
        Ok(())
    }

    async fn dial_single(
        &self,
        data: &mut CampaignData,
        token: &str,
        event: &ProtocolEvent,
        snapshot: ParticipantSnapshot,
    ) -> Result<(), OutdialError> {
        let Some(dn) = event.extension_dn().map(str::to_string) else {
            warn!(entity = %event.entity, "event entity has no extension, discarding");
            return Ok(());
        };

        let live = match snapshot {
            ParticipantSnapshot::Present(_) => true,
            ParticipantSnapshot::Absent => false,
            ParticipantSnapshot::NotCaptured => matches!(
                self.shared
                    .deps
                    .control_plane
                    .get_participant(token, &event.entity)
                    .await,
                Ok(Some(_))
            ),
        };
        if live {
            debug!(dn = %dn, entity = %event.entity, "participant still live, no dial");
            return Ok(());
        }

        let ext = data
            .agents
            .iter()
            .find(|e| e.dn == dn)
            .cloned()
            .ok_or_else(|| OutdialError::ControlPlane {
                message: format!("extension {dn} is not in the roster"),
                source: None,
            })?;
        if !ext.is_idle() {
            data.advisory.warning = Some(format!("extension {dn} still has a live participant"));
            return Ok(());
        }

        let profile = self
            .shared
            .deps
            .control_plane
            .agent_profile(token, &dn)
            .await?;
        if !profile.is_available() {
            data.advisory.warning = Some(format!("agent on extension {dn} is unavailable"));
            return Ok(());
        }

        self.dial_extension(data, token, &ext).await
    }

    /// Pop the next customer for `ext`, rotate the ledger and place the call.
    async fn dial_extension(
        &self,
        data: &mut CampaignData,
        token: &str,
        ext: &Extension,
    ) -> Result<(), OutdialError> {
        let device = ext.primary_device().ok_or_else(|| OutdialError::ControlPlane {
            message: format!("extension {} has no device", ext.dn),
            source: None,
        })?;

        let item = self.shared.deps.queue.pop_next(&self.shared.id).await?;

        let replenisher = Replenisher {
            queue: self.shared.deps.queue.as_ref(),
            records: self.shared.deps.records.as_ref(),
        };
        if let Err(e) = replenisher
            .replenish(&self.shared.id, &data.config.call_flow_id, data.agents.len())
            .await
        {
            warn!(campaign_id = %self.shared.id, error = %e, "call queue replenish failed");
        }

        let had_current = data.ledger.current(&ext.dn).is_some();
        if let Some(displaced) = data.ledger.archive_current(&ext.dn) {
            warn!(dn = %ext.dn, customer_id = %displaced.customer_id, "pending record displaced, writing back now");
            self.write_back(data, displaced).await;
        }

        if let Some(item) = &item {
            data.ledger
                .begin(CallRecord::dialing(item, &ext.dn, Utc::now()));
        }
        if item.is_some() || had_current {
            self.persist(CampaignField::CurrentCalls(data.ledger.current_records()))
                .await;
        }

        if !self.shared.settings.pre_dial_delay.is_zero() {
            tokio::time::sleep(self.shared.settings.pre_dial_delay).await;
        }
        if let Some(pending) = data.ledger.take_pending(&ext.dn) {
            self.write_back(data, pending).await;
        }

        match item {
            Some(item) => {
                self.shared
                    .deps
                    .control_plane
                    .place_call(token, &ext.dn, &device.device_id, &item.phone)
                    .await?;
                info!(
                    campaign_id = %self.shared.id,
                    dn = %ext.dn,
                    customer_id = %item.customer_id,
                    "outbound call placed"
                );
            }
            None => info!(campaign_id = %self.shared.id, dn = %ext.dn, "call queue empty"),
        }
        self.refresh_view(data);
        Ok(())
    }

    // --- write-back --------------------------------------------------------

    /// Report a finished call. Failures are logged; the queue entry is always retired.
    async fn write_back(&self, data: &mut CampaignData, record: CallRecord) {
        let records = &self.shared.deps.records;
        let queue = &self.shared.deps.queue;
        let campaign_id = record.campaign_id.as_str();
        let customer_id = record.customer_id.as_str();
        info!(
            campaign_id,
            dn = %record.dn,
            customer_id,
            status = %record.status,
            "writing back call outcome"
        );

        match record.status {
            CallStatus::Dialing => {
                self.touch_last_execution(data, &record.dn).await;
                log_failure(
                    "report failed call",
                    customer_id,
                    records
                        .report_call_status(campaign_id, customer_id, OutcomeCode::Failed)
                        .await,
                );
                log_failure(
                    "increment dial attempt",
                    customer_id,
                    records.increment_dial_attempt(campaign_id, customer_id).await,
                );
                log_failure(
                    "retire queue entry",
                    customer_id,
                    queue.remove_used(campaign_id, customer_id).await,
                );
                log_failure(
                    "advance auto-dial marker",
                    customer_id,
                    records
                        .advance_auto_dial_marker(campaign_id, &data.config.call_flow_id)
                        .await,
                );
                if record.description.trim().is_empty() || record.description2.trim().is_empty() {
                    debug!(customer_id, "record has no descriptions, skipping relay");
                } else {
                    self.relay(&record).await;
                }
            }
            CallStatus::Connected => {
                self.touch_last_execution(data, &record.dn).await;
                log_failure(
                    "report connected call",
                    customer_id,
                    records
                        .report_call_status(campaign_id, customer_id, OutcomeCode::Connected)
                        .await,
                );
                if !self.shared.settings.visit_record_delay.is_zero() {
                    tokio::time::sleep(self.shared.settings.visit_record_delay).await;
                }
                let visit = VisitRecord {
                    campaign_id: campaign_id.to_string(),
                    customer_id: customer_id.to_string(),
                    visit_type: VISIT_TYPE.into(),
                    visited_by: VISITED_BY.into(),
                    visited_at: record.dial_time,
                    title: VISIT_TITLE.into(),
                    detail: VISIT_TITLE.into(),
                };
                log_failure(
                    "write visit record",
                    customer_id,
                    records.write_visit_record(&visit).await,
                );
                log_failure(
                    "retire queue entry",
                    customer_id,
                    queue.remove_used(campaign_id, customer_id).await,
                );
                log_failure(
                    "advance auto-dial marker",
                    customer_id,
                    records
                        .advance_auto_dial_marker(campaign_id, &data.config.call_flow_id)
                        .await,
                );
            }
            CallStatus::Unknown => {
                log_failure(
                    "retire queue entry",
                    customer_id,
                    queue.remove_used(campaign_id, customer_id).await,
                );
            }
        }
    }

    /// Relay an unanswered call: primary with retries, secondary only after business success.
    async fn relay(&self, record: &CallRecord) {
        let relay = &self.shared.deps.relay;
        if !relay.is_enabled() {
            debug!(customer_id = %record.customer_id, "relay disabled");
            return;
        }
        let max_attempts = self.shared.settings.relay_max_attempts.max(1);
        let mut accepted = false;

        for attempt in 1..=max_attempts {
            match relay
                .relay_primary(&record.description, &record.description2, &record.phone)
                .await
            {
                Ok(receipt) if receipt.is_business_success() => {
                    info!(customer_id = %record.customer_id, attempt, "primary relay accepted");
                    accepted = true;
                    break;
                }
                Ok(receipt) => warn!(
                    customer_id = %record.customer_id,
                    attempt,
                    status_code = receipt.status_code,
                    message = %receipt.message,
                    "primary relay rejected"
                ),
                Err(e) => warn!(
                    customer_id = %record.customer_id,
                    attempt,
                    error = %e,
                    "primary relay failed"
                ),
            }
            if attempt < max_attempts && !self.shared.settings.relay_retry_delay.is_zero() {
                tokio::time::sleep(self.shared.settings.relay_retry_delay).await;
            }
        }

        if !accepted {
            warn!(customer_id = %record.customer_id, "primary relay exhausted, skipping secondary");
            return;
        }
        if let Err(e) = relay
            .relay_secondary(&record.description, &record.description2, &record.phone)
            .await
        {
            warn!(customer_id = %record.customer_id, error = %e, "secondary relay failed");
        }
    }

    async fn touch_last_execution(&self, data: &mut CampaignData, dn: &str) {
        data.last_execution.insert(dn.to_string(), Utc::now());
        self.persist(CampaignField::LastExecution(data.last_execution.clone()))
            .await;
    }

    // --- stop --------------------------------------------------------------

    /// Enter `stopping`. Tears down at once when no call is live.
    pub async fn request_stop(&self) {
        if self.state() != CampaignState::Active {
            debug!(campaign_id = %self.shared.id, state = %self.state(), "stop already requested");
            return;
        }
        self.shared.state.send_replace(CampaignState::Stopping);
        self.persist(CampaignField::State(CampaignState::Stopping))
            .await;
        self.stop_idle_poller().await;

        if self.has_live_calls() {
            info!(campaign_id = %self.shared.id, "campaign stopping, waiting for live calls");
            self.shared.deps.broadcast_all(Some(&self.shared.id)).await;
        } else {
            self.complete_stop().await;
        }
    }

    /// One drain check while stopping: refresh the roster and finish once it is quiet.
    async fn drain_step(&self) {
        let live = {
            let mut data = self.shared.data.lock().await;
            match self.shared.credentials.access_token() {
                Some(token) => {
                    if let Err(e) = self.refresh_roster(&mut data, &token).await {
                        warn!(campaign_id = %self.shared.id, error = %e, "roster refresh while stopping failed");
                    }
                }
                None => warn!(campaign_id = %self.shared.id, "no token while stopping"),
            }
            data.agents.iter().any(|e| !e.is_idle())
        };
        self.shared.deps.broadcast_all(Some(&self.shared.id)).await;

        if live {
            debug!(campaign_id = %self.shared.id, "live calls remain, still draining");
            return;
        }
        if !self.shared.settings.stop_grace.is_zero() {
            tokio::time::sleep(self.shared.settings.stop_grace).await;
        }
        self.complete_stop().await;
    }

    /// Flush every record, clear the queue, disconnect and deregister. Runs once.
    pub async fn complete_stop(&self) {
        if self.shared.stop_done.swap(true, Ordering::AcqRel) {
            debug!(campaign_id = %self.shared.id, "campaign already stopped");
            return;
        }
        info!(campaign_id = %self.shared.id, "completing campaign stop");
        self.stop_idle_poller().await;

        {
            let mut data = self.shared.data.lock().await;
            let records = data.ledger.drain_all();
            if !records.is_empty() {
                info!(campaign_id = %self.shared.id, count = records.len(), "flushing call records");
            }
            for record in records {
                self.write_back(&mut data, record).await;
            }
        }

        match self.shared.deps.queue.clear(&self.shared.id).await {
            Ok(cleared) => info!(campaign_id = %self.shared.id, cleared, "call queue cleared"),
            Err(e) => warn!(campaign_id = %self.shared.id, error = %e, "failed to clear call queue"),
        }
        self.disconnect().await;
        if let Err(e) = self.shared.deps.registry.remove(&self.shared.id).await {
            warn!(campaign_id = %self.shared.id, error = %e, "failed to remove campaign from registry");
        }

        self.shared.cancel.cancel();
        self.shared.state.send_replace(CampaignState::Stopped);
        self.shared.directory.remove(&self.shared.id);
        self.shared.deps.broadcast_all(Some(&self.shared.id)).await;
        info!(campaign_id = %self.shared.id, "campaign stopped");
    }

    /// Stop background work and close the link without touching queue or registry.
    pub(crate) async fn detach(&self) {
        self.stop_idle_poller().await;
        self.shared.cancel.cancel();
        self.disconnect().await;
    }

    // --- idle poller -------------------------------------------------------

    async fn start_idle_poller(&self) {
        let settings = &self.shared.settings;
        if !settings.idle_check_enabled {
            return;
        }
        let mut slot = self.shared.idle.lock().await;
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        let token = self.shared.cancel.child_token();
        *slot = Some(token.clone());

        let backoff = IdleBackoff::new(
            settings.idle_check_min,
            settings.idle_check_max,
            settings.idle_check_backoff_factor,
        );
        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(run_idle_poller(
            self.shared.id.clone(),
            backoff,
            token,
            move || {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(shared) => Campaign { shared }.idle_probe(),
                        None => false,
                    }
                }
            },
        ));
    }

    async fn stop_idle_poller(&self) {
        if let Some(token) = self.shared.idle.lock().await.take() {
            token.cancel();
        }
    }

    /// One idle tick. Schedules a jittered initial cycle when an extension is ready.
    fn idle_probe(&self) -> bool {
        if self.state() != CampaignState::Active {
            return false;
        }
        let view = self.shared.view.load();
        let ready = has_ready_extension(
            &view.agents,
            &view.last_execution,
            Utc::now(),
            self.shared.settings.extension_cooldown,
        );
        if !ready {
            return false;
        }

        let delay = jitter(
            self.shared.settings.idle_jitter_min,
            self.shared.settings.idle_jitter_max,
        );
        debug!(campaign_id = %self.shared.id, delay_ms = delay.as_millis() as u64, "idle extension found");
        let campaign = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if campaign.state() == CampaignState::Active {
                campaign.enqueue(DialTrigger::Initial);
            }
        });
        true
    }

    // --- persistence helpers -----------------------------------------------

    fn refresh_view(&self, data: &CampaignData) {
        self.shared.view.store(Arc::new(RosterView {
            agents: data.agents.clone(),
            last_execution: data.last_execution.clone(),
        }));
    }

    async fn persist(&self, field: CampaignField) {
        if let Err(e) = self
            .shared
            .deps
            .registry
            .update_field(&self.shared.id, field)
            .await
        {
            warn!(campaign_id = %self.shared.id, error = %e, "failed to persist campaign field");
        }
    }

    /// Mutate the advisory slots outside a cycle, then persist and broadcast.
    async fn set_advisory(&self, update: impl FnOnce(&mut Advisory)) {
        let advisory = {
            let mut data = self.shared.data.lock().await;
            update(&mut data.advisory);
            data.advisory.clone()
        };
        self.persist(CampaignField::Advisory(advisory)).await;
        self.shared.deps.broadcast_all(Some(&self.shared.id)).await;
    }
}

/// The first failing gate, as a warning message.
fn gate_block(config: &CampaignConfig, now: DateTime<Utc>) -> Option<String> {
    if let Some(expression) = config.recurrence.as_deref().filter(|s| !s.trim().is_empty()) {
        match Recurrence::parse(expression) {
            Ok(recurrence) if !recurrence.includes_day(now) => {
                return Some("today is outside the recurrence schedule".into());
            }
            Ok(_) => {}
            Err(e) => return Some(format!("recurrence cannot be evaluated: {e}")),
        }
    }
    match blocking_restriction(&config.call_restrictions, now) {
        Ok(Some(window)) => Some(format!(
            "dialing is restricted between {} and {} UTC",
            window.start_time, window.stop_time
        )),
        Ok(None) => None,
        Err(e) => Some(format!("call restriction cannot be evaluated: {e}")),
    }
}

fn log_failure(step: &str, customer_id: &str, result: Result<(), OutdialError>) {
    if let Err(e) = result {
        warn!(step, customer_id, error = %e, "write-back step failed");
    }
}

async fn run_worker(
    campaign: Weak<Shared>,
    mut rx: mpsc::UnboundedReceiver<DialTrigger>,
    cancel: CancellationToken,
) {
    loop {
        let trigger = tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(trigger) => trigger,
                None => break,
            },
        };
        let Some(shared) = campaign.upgrade() else {
            break;
        };
        Campaign { shared }.handle_trigger(trigger).await;
    }
    debug!("decision worker stopped");
}

/// Frame handler registered with the protocol connection. Never blocks.
struct CampaignHandler {
    campaign: Weak<Shared>,
}

impl CampaignHandler {
    fn campaign(&self) -> Option<Campaign> {
        self.campaign.upgrade().map(|shared| Campaign { shared })
    }
}

#[async_trait]
impl FrameHandler for CampaignHandler {
    async fn on_open(&self, reconnected: bool) {
        let Some(campaign) = self.campaign() else {
            return;
        };
        info!(campaign_id = %campaign.id(), reconnected, "protocol connection open");
        campaign.enqueue(DialTrigger::Opened);
    }

    async fn on_event(&self, event: ProtocolEvent) {
        let Some(campaign) = self.campaign() else {
            return;
        };
        debug!(campaign_id = %campaign.id(), kind = %event.kind, entity = %event.entity, "event received");
        let snapshot = campaign.capture_participant(&event);
        campaign.enqueue(DialTrigger::Event { event, snapshot });
    }

    async fn on_failure(&self, message: String) {
        if let Some(campaign) = self.campaign() {
            campaign.enqueue(DialTrigger::ConnectionLost(message));
        }
    }
}
