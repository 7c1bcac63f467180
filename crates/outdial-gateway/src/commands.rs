// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command channel wire format.
//!
//! Client -> Server (JSON):
//! ```json
//! {"command": "start", "campaign": {"campaign_id": "...", "call_flow_id": "...", ...}}
//! {"command": "stop", "campaign_id": "..."}
//! {"command": "ping"}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"event": "campaigns", "changed": "...", "data": [...]}
//! {"event": "pong"}
//! {"event": "error", "message": "..."}
//! ```

use outdial_campaign::Dialer;
use outdial_core::types::{CampaignConfig, CampaignSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ClientCommand {
    Start { campaign: CampaignConfig },
    Stop { campaign_id: String },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ServerEvent {
    Campaigns {
        changed: Option<String>,
        data: Vec<CampaignSnapshot>,
    },
    Pong,
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// A snapshot list event with credentials stripped.
    pub fn campaigns(snapshots: &[CampaignSnapshot], changed: Option<&str>) -> Self {
        ServerEvent::Campaigns {
            changed: changed.map(str::to_string),
            data: snapshots.iter().map(CampaignSnapshot::redacted).collect(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"event":"error","message":"event serialization failed: {e}"}}"#)
        })
    }
}

/// Parse one inbound text frame.
pub fn parse_command(text: &str) -> Result<ClientCommand, String> {
    serde_json::from_str(text).map_err(|e| format!("invalid command: {e}"))
}

/// Run a command. Returns the direct reply, if any; state changes reach clients by broadcast.
pub async fn dispatch(dialer: &Dialer, command: ClientCommand) -> Option<ServerEvent> {
    match command {
        ClientCommand::Ping => Some(ServerEvent::Pong),
        ClientCommand::Start { campaign } => {
            let campaign_id = campaign.campaign_id.clone();
            info!(campaign_id = %campaign_id, "start command received");
            match dialer.start(campaign).await {
                Ok(_) => None,
                Err(e) => {
                    warn!(campaign_id = %campaign_id, error = %e, "start command failed");
                    Some(ServerEvent::error(format!(
                        "failed to start campaign {campaign_id}: {e}"
                    )))
                }
            }
        }
        ClientCommand::Stop { campaign_id } => {
            info!(campaign_id = %campaign_id, "stop command received");
            if dialer.stop(&campaign_id).await {
                None
            } else {
                Some(ServerEvent::error(format!(
                    "campaign {campaign_id} is not running"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_command_deserializes() {
        let json = r#"{
            "command": "start",
            "campaign": {
                "campaign_id": "p1",
                "call_flow_id": "f1",
                "client_id": "id",
                "client_secret": "secret",
                "call_restrictions": [{"start_time": "14:00", "stop_time": "01:30"}]
            }
        }"#;
        let ClientCommand::Start { campaign } = parse_command(json).unwrap() else {
            panic!("expected start");
        };
        assert_eq!(campaign.campaign_id, "p1");
        assert_eq!(campaign.call_restrictions.len(), 1);
        assert!(campaign.recurrence.is_none());
    }

    #[test]
    fn stop_and_ping_deserialize() {
        assert!(matches!(
            parse_command(r#"{"command":"stop","campaign_id":"p1"}"#),
            Ok(ClientCommand::Stop { campaign_id }) if campaign_id == "p1"
        ));
        assert!(matches!(
            parse_command(r#"{"command":"ping"}"#),
            Ok(ClientCommand::Ping)
        ));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = parse_command(r#"{"command":"pause"}"#).unwrap_err();
        assert!(err.starts_with("invalid command"));
    }

    #[test]
    fn events_serialize_with_tag() {
        assert_eq!(ServerEvent::Pong.to_json(), r#"{"event":"pong"}"#);
        assert_eq!(
            ServerEvent::error("boom").to_json(),
            r#"{"event":"error","message":"boom"}"#
        );
        let event = ServerEvent::campaigns(&[], Some("p1"));
        assert_eq!(
            event.to_json(),
            r#"{"event":"campaigns","changed":"p1","data":[]}"#
        );
    }
}
