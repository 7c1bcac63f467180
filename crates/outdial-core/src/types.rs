// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Outdial workspace.
//!
//! These are the wire-level shapes exchanged with the telephony control plane,
//! the campaign-record service, and the campaign registry.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CampaignState {
    /// Decision cycles and the idle poller run.
    Active,
    /// No new dials; in-flight calls drain before teardown.
    Stopping,
    /// Terminal. Connection torn down and registry entry removed.
    Stopped,
}

/// A telephony device registered to an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Status of a call leg as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum CallStatus {
    Dialing,
    Connected,
    /// Any status the dialer does not act on (ringing, transferring, ...).
    #[serde(other)]
    Unknown,
}

/// A live call leg on an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_caller_id: Option<String>,
}

/// A worker extension in the campaign roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub dn: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Extension {
    /// An extension is idle when it has no live participant.
    pub fn is_idle(&self) -> bool {
        self.participants.is_empty()
    }

    /// The device outbound calls are placed from.
    pub fn primary_device(&self) -> Option<&Device> {
        self.devices.first()
    }

    /// The first live participant, if any.
    pub fn live_participant(&self) -> Option<&Participant> {
        self.participants.first()
    }
}

/// One dial attempt tracked per extension until its outcome is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub campaign_id: String,
    pub customer_id: String,
    pub member_name: String,
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description2: String,
    pub status: CallStatus,
    pub dn: String,
    pub dial_time: DateTime<Utc>,
}

impl CallRecord {
    /// Start a new record for `item` on extension `dn`, in `Dialing` status.
    pub fn dialing(item: &QueueItem, dn: &str, dial_time: DateTime<Utc>) -> Self {
        Self {
            campaign_id: item.campaign_id.clone(),
            customer_id: item.customer_id.clone(),
            member_name: item.member_name.clone(),
            phone: item.phone.clone(),
            description: item.description.clone(),
            description2: item.description2.clone(),
            status: CallStatus::Dialing,
            dn: dn.to_string(),
            dial_time,
        }
    }
}

/// A customer waiting in a campaign's call queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub campaign_id: String,
    pub customer_id: String,
    pub member_name: String,
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description2: String,
}

/// A time-of-day window (UTC, `HH:MM`) during which no call may be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRestriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub start_time: String,
    pub stop_time: String,
}

/// Campaign definition supplied by the command channel or restored from the registry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub campaign_id: String,
    pub call_flow_id: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub call_restrictions: Vec<CallRestriction>,
}

impl fmt::Debug for CampaignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CampaignConfig")
            .field("campaign_id", &self.campaign_id)
            .field("call_flow_id", &self.call_flow_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("recurrence", &self.recurrence)
            .field("call_restrictions", &self.call_restrictions)
            .finish()
    }
}

/// The single advisory slot set of a campaign. Last write wins per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl Advisory {
    pub fn clear(&mut self) {
        *self = Advisory::default();
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.warning.is_none() && self.info.is_none()
    }
}

/// Durable, broadcastable view of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub campaign_id: String,
    pub call_flow_id: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub state: CampaignState,
    #[serde(default)]
    pub agents: Vec<Extension>,
    #[serde(default)]
    pub advisory: Advisory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub call_restrictions: Vec<CallRestriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub current_calls: Vec<CallRecord>,
    #[serde(default)]
    pub last_execution: HashMap<String, DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignSnapshot {
    /// The definition needed to restart this campaign.
    pub fn config(&self) -> CampaignConfig {
        CampaignConfig {
            campaign_id: self.campaign_id.clone(),
            call_flow_id: self.call_flow_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            recurrence: self.recurrence.clone(),
            call_restrictions: self.call_restrictions.clone(),
        }
    }

    /// Copy with credentials stripped, for publishing to dashboard clients.
    pub fn redacted(&self) -> Self {
        Self {
            client_secret: String::new(),
            access_token: None,
            ..self.clone()
        }
    }

    /// Number of worker extensions.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

/// A single field update applied to a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignField {
    State(CampaignState),
    Advisory(Advisory),
    Agents(Vec<Extension>),
    AccessToken(Option<String>),
    CurrentCalls(Vec<CallRecord>),
    LastExecution(HashMap<String, DateTime<Utc>>),
}

impl CampaignField {
    /// Apply this update to a snapshot in place.
    pub fn apply(self, snapshot: &mut CampaignSnapshot) {
        match self {
            CampaignField::State(state) => snapshot.state = state,
            CampaignField::Advisory(advisory) => snapshot.advisory = advisory,
            CampaignField::Agents(agents) => snapshot.agents = agents,
            CampaignField::AccessToken(token) => snapshot.access_token = token,
            CampaignField::CurrentCalls(calls) => snapshot.current_calls = calls,
            CampaignField::LastExecution(map) => snapshot.last_execution = map,
        }
    }
}

/// Kind of an inbound protocol event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventKind {
    #[strum(serialize = "participant-appeared")]
    ParticipantAppeared,
    #[strum(serialize = "participant-changed")]
    ParticipantChanged,
}

impl TryFrom<u8> for EventKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventKind::ParticipantAppeared),
            1 => Ok(EventKind::ParticipantChanged),
            other => Err(other),
        }
    }
}

/// A decoded event frame from the protocol connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolEvent {
    pub sequence: Option<u64>,
    pub kind: EventKind,
    /// Entity address, `/callcontrol/{dn}/participants/{id}`.
    pub entity: String,
}

impl ProtocolEvent {
    /// The extension (`dn`) segment of the entity address.
    pub fn extension_dn(&self) -> Option<&str> {
        let mut segments = self.entity.split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next()) {
            (Some("callcontrol"), Some(dn)) => Some(dn),
            _ => None,
        }
    }
}

/// Access credential grant returned by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds from issuance.
    pub expires_in: u64,
}

/// Availability profile of the agent behind an extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(default, rename = "CurrentProfileName")]
    pub current_profile_name: Option<String>,
}

impl AgentProfile {
    /// Missing profile names count as available.
    pub fn is_available(&self) -> bool {
        match self.current_profile_name.as_deref() {
            None | Some("") => true,
            Some(name) => name == "Available",
        }
    }
}

/// A "who to call next" row from the campaign-record service. Fields may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description2: Option<String>,
}

impl Candidate {
    /// Convert to a queue item, or `None` when the customer id or phone is missing.
    pub fn into_queue_item(self, campaign_id: &str) -> Option<QueueItem> {
        let customer_id = self.customer_id.filter(|s| !s.trim().is_empty())?;
        let phone = self.phone.filter(|s| !s.trim().is_empty())?;
        Some(QueueItem {
            campaign_id: campaign_id.to_string(),
            customer_id,
            member_name: self.member_name.unwrap_or_default(),
            phone,
            description: self.description.unwrap_or_default(),
            description2: self.description2.unwrap_or_default(),
        })
    }
}

/// Call-status filter used when fetching candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CandidateStatus {
    /// Never attempted.
    #[strum(serialize = "0")]
    Pending,
    /// Previously failed.
    #[strum(serialize = "2")]
    Failed,
}

/// Outcome code reported to the campaign-record service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCode {
    Connected = 1,
    Failed = 2,
}

impl OutcomeCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A visit (contact) record written after a connected call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub campaign_id: String,
    pub customer_id: String,
    pub visit_type: String,
    pub visited_by: String,
    pub visited_at: DateTime<Utc>,
    pub title: String,
    pub detail: String,
}

/// Response of the primary notification relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelayReceipt {
    pub status_code: i64,
    #[serde(default)]
    pub message: String,
}

impl RelayReceipt {
    /// Transport success is not enough; the relay must also accept the payload.
    pub fn is_business_success(&self) -> bool {
        self.status_code == 0 && self.message == "Success"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(entity: &str) -> ProtocolEvent {
        ProtocolEvent {
            sequence: None,
            kind: EventKind::ParticipantChanged,
            entity: entity.to_string(),
        }
    }

    #[test]
    fn extension_dn_from_entity() {
        assert_eq!(
            event("/callcontrol/101/participants/7").extension_dn(),
            Some("101")
        );
        assert_eq!(event("/other/101").extension_dn(), None);
        assert_eq!(event("").extension_dn(), None);
    }

    #[test]
    fn unknown_call_status_deserializes() {
        let p: Participant =
            serde_json::from_str(r#"{"id": 3, "status": "Ringing"}"#).unwrap();
        assert_eq!(p.status, CallStatus::Unknown);
        let p: Participant =
            serde_json::from_str(r#"{"id": 3, "status": "Connected"}"#).unwrap();
        assert_eq!(p.status, CallStatus::Connected);
    }

    #[test]
    fn profile_availability() {
        assert!(AgentProfile::default().is_available());
        assert!(AgentProfile {
            current_profile_name: Some("Available".into())
        }
        .is_available());
        assert!(!AgentProfile {
            current_profile_name: Some("Lunch".into())
        }
        .is_available());
    }

    #[test]
    fn candidate_without_phone_is_rejected() {
        let c = Candidate {
            customer_id: Some("c1".into()),
            phone: Some("  ".into()),
            ..Default::default()
        };
        assert!(c.into_queue_item("p1").is_none());
    }

    #[test]
    fn relay_receipt_business_success() {
        let r: RelayReceipt =
            serde_json::from_str(r#"{"StatusCode": 0, "Message": "Success"}"#).unwrap();
        assert!(r.is_business_success());
        let r: RelayReceipt =
            serde_json::from_str(r#"{"StatusCode": 0, "Message": "Queued"}"#).unwrap();
        assert!(!r.is_business_success());
    }

    #[test]
    fn config_debug_redacts_secret() {
        let config = CampaignConfig {
            campaign_id: "p1".into(),
            call_flow_id: "f1".into(),
            client_id: "id".into(),
            client_secret: "hunter2".into(),
            recurrence: None,
            call_restrictions: vec![],
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn candidate_status_codes() {
        assert_eq!(CandidateStatus::Pending.to_string(), "0");
        assert_eq!(CandidateStatus::Failed.to_string(), "2");
        assert_eq!(OutcomeCode::Failed.code(), 2);
    }
}
