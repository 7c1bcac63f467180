// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable telephony control plane.
//!
//! Tests set the roster, participants and agent profiles directly; placed
//! calls are captured. `list_extensions` doubles as a concurrency probe: it
//! tracks how many callers are inside it at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use outdial_core::types::{
    AgentProfile, CallStatus, Device, Extension, Participant, TokenGrant,
};
use outdial_core::{ControlPlane, OutdialError};

/// A call captured by [`MockControlPlane::place_call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub token: String,
    pub dn: String,
    pub device_id: String,
    pub destination: String,
}

/// An idle extension with one device named `dev-{dn}`.
pub fn idle_extension(dn: &str) -> Extension {
    Extension {
        dn: dn.to_string(),
        kind: Some("Wextension".into()),
        devices: vec![Device {
            device_id: format!("dev-{dn}"),
            user_agent: None,
        }],
        participants: vec![],
    }
}

/// An extension with one live participant in `status`.
pub fn busy_extension(dn: &str, status: CallStatus) -> Extension {
    let mut ext = idle_extension(dn);
    ext.participants.push(Participant {
        id: 1,
        status,
        dn: Some(dn.to_string()),
        party_caller_id: None,
    });
    ext
}

pub struct MockControlPlane {
    roster: Mutex<Vec<Extension>>,
    participants: Mutex<HashMap<String, Participant>>,
    profiles: Mutex<HashMap<String, AgentProfile>>,
    placed: Mutex<Vec<PlacedCall>>,
    tokens_issued: AtomicUsize,
    token_lifetime_secs: u64,
    roster_delay: Mutex<Duration>,
    fail_roster: Mutex<Option<String>>,
    in_roster: AtomicUsize,
    max_in_roster: AtomicUsize,
    roster_calls: AtomicUsize,
}

impl MockControlPlane {
    pub fn new(roster: Vec<Extension>) -> Self {
        Self {
            roster: Mutex::new(roster),
            participants: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            placed: Mutex::new(Vec::new()),
            tokens_issued: AtomicUsize::new(0),
            token_lifetime_secs: 3600,
            roster_delay: Mutex::new(Duration::ZERO),
            fail_roster: Mutex::new(None),
            in_roster: AtomicUsize::new(0),
            max_in_roster: AtomicUsize::new(0),
            roster_calls: AtomicUsize::new(0),
        }
    }

    /// Tokens expire after `secs`. Short lifetimes force a refresh on every check.
    pub fn with_token_lifetime(mut self, secs: u64) -> Self {
        self.token_lifetime_secs = secs;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub async fn set_roster(&self, roster: Vec<Extension>) {
        *self.roster.lock().await = roster;
    }

    pub async fn set_participant(&self, entity: &str, participant: Option<Participant>) {
        let mut map = self.participants.lock().await;
        match participant {
            Some(p) => {
                map.insert(entity.to_string(), p);
            }
            None => {
                map.remove(entity);
            }
        }
    }

    pub async fn set_profile(&self, dn: &str, name: &str) {
        self.profiles.lock().await.insert(
            dn.to_string(),
            AgentProfile {
                current_profile_name: Some(name.to_string()),
            },
        );
    }

    /// Make every roster read sleep first, widening the window for overlap.
    pub async fn set_roster_delay(&self, delay: Duration) {
        *self.roster_delay.lock().await = delay;
    }

    pub async fn fail_roster_with(&self, message: Option<&str>) {
        *self.fail_roster.lock().await = message.map(str::to_string);
    }

    pub async fn placed_calls(&self) -> Vec<PlacedCall> {
        self.placed.lock().await.clone()
    }

    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `list_extensions` calls observed.
    pub fn max_concurrent_roster_reads(&self) -> usize {
        self.max_in_roster.load(Ordering::SeqCst)
    }

    pub fn roster_reads(&self) -> usize {
        self.roster_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn issue_token(
        &self,
        client_id: &str,
        _client_secret: &str,
    ) -> Result<TokenGrant, OutdialError> {
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenGrant {
            access_token: format!("{client_id}-tok-{n}"),
            expires_in: self.token_lifetime_secs,
        })
    }

    async fn list_extensions(&self, _token: &str) -> Result<Vec<Extension>, OutdialError> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        let inside = self.in_roster.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_roster.fetch_max(inside, Ordering::SeqCst);

        let delay = *self.roster_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = self.fail_roster.lock().await.clone();
        let result = match failure {
            Some(message) => Err(OutdialError::ControlPlane {
                message,
                source: None,
            }),
            None => Ok(self.roster.lock().await.clone()),
        };

        self.in_roster.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get_participant(
        &self,
        _token: &str,
        entity: &str,
    ) -> Result<Option<Participant>, OutdialError> {
        Ok(self.participants.lock().await.get(entity).cloned())
    }

    async fn place_call(
        &self,
        token: &str,
        dn: &str,
        device_id: &str,
        destination: &str,
    ) -> Result<(), OutdialError> {
        self.placed.lock().await.push(PlacedCall {
            token: token.to_string(),
            dn: dn.to_string(),
            device_id: device_id.to_string(),
            destination: destination.to_string(),
        });
        Ok(())
    }

    async fn agent_profile(&self, _token: &str, dn: &str) -> Result<AgentProfile, OutdialError> {
        Ok(self.profiles.lock().await.get(dn).cloned().unwrap_or_default())
    }
}
