// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign snapshot fan-out to connected dashboard clients.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use outdial_core::types::CampaignSnapshot;
use outdial_core::{BroadcastSink, OutdialError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::commands::ServerEvent;

/// Outbound buffer per client. A client this far behind is skipped for a publish.
const CLIENT_BUFFER: usize = 64;

/// Registry of connected clients keyed by connection id.
#[derive(Clone, Default)]
pub struct WsBroadcaster {
    clients: Arc<DashMap<String, mpsc::Sender<String>>>,
}

impl WsBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and return the receiving half of its outbound channel.
    pub fn register(&self, client_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.insert(client_id.to_string(), tx);
        rx
    }

    pub fn unregister(&self, client_id: &str) {
        self.clients.remove(client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Queue a frame for one client. False when the client is gone or full.
    pub fn send_to(&self, client_id: &str, frame: String) -> bool {
        match self.clients.get(client_id) {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }

    fn fan_out(&self, frame: &str) {
        let mut closed = Vec::new();
        for entry in self.clients.iter() {
            match entry.value().try_send(frame.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(client_id = %entry.key(), "client outbound buffer full, frame dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(entry.key().clone()),
            }
        }
        for client_id in closed {
            debug!(client_id = %client_id, "removing closed client");
            self.clients.remove(&client_id);
        }
    }
}

#[async_trait]
impl BroadcastSink for WsBroadcaster {
    async fn publish(
        &self,
        snapshots: &[CampaignSnapshot],
        changed_campaign_id: Option<&str>,
    ) -> Result<(), OutdialError> {
        let frame = ServerEvent::campaigns(snapshots, changed_campaign_id).to_json();
        self.fan_out(&frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use outdial_core::CampaignState;
    use outdial_core::types::Advisory;

    use super::*;

    fn snapshot() -> CampaignSnapshot {
        CampaignSnapshot {
            campaign_id: "p1".into(),
            call_flow_id: "f1".into(),
            client_id: "id".into(),
            client_secret: "do-not-leak".into(),
            state: CampaignState::Active,
            agents: vec![],
            advisory: Advisory::default(),
            recurrence: None,
            call_restrictions: vec![],
            access_token: Some("token-do-not-leak".into()),
            current_calls: vec![],
            last_execution: Default::default(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_client_redacted() {
        let broadcaster = WsBroadcaster::new();
        let mut a = broadcaster.register("a");
        let mut b = broadcaster.register("b");

        broadcaster.publish(&[snapshot()], Some("p1")).await.unwrap();

        for rx in [&mut a, &mut b] {
            let frame = rx.recv().await.unwrap();
            assert!(frame.contains(r#""event":"campaigns""#));
            assert!(frame.contains(r#""changed":"p1""#));
            assert!(!frame.contains("do-not-leak"));
        }
    }

    #[tokio::test]
    async fn closed_clients_are_pruned() {
        let broadcaster = WsBroadcaster::new();
        let rx = broadcaster.register("gone");
        let _live = broadcaster.register("live");
        drop(rx);

        broadcaster.publish(&[], None).await.unwrap();

        assert_eq!(broadcaster.client_count(), 1);
        assert!(!broadcaster.send_to("gone", "x".into()));
        assert!(broadcaster.send_to("live", "x".into()));
    }
}
