// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol connector whose frames are injected by the test.
//!
//! `connect` never fires `on_open` by itself; call [`MockConnector::open`]
//! to simulate the socket coming up, then [`MockConnector::emit`] to deliver
//! events to the most recently registered handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use outdial_core::types::{EventKind, ProtocolEvent};
use outdial_core::{FrameHandler, OutdialError, ProtocolConnector, ProtocolLink};

#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

#[derive(Default)]
pub struct MockConnector {
    handlers: Mutex<Vec<Arc<dyn FrameHandler>>>,
    tokens: Mutex<Vec<String>>,
    counters: Arc<Counters>,
    refuse: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent connects fail with a protocol error.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    /// Disconnects that actually closed a live link.
    pub fn disconnects(&self) -> usize {
        self.counters.disconnects.load(Ordering::SeqCst)
    }

    pub async fn tokens(&self) -> Vec<String> {
        self.tokens.lock().await.clone()
    }

    async fn latest(&self) -> Option<Arc<dyn FrameHandler>> {
        self.handlers.lock().await.last().cloned()
    }

    pub async fn open(&self, reconnected: bool) {
        if let Some(handler) = self.latest().await {
            handler.on_open(reconnected).await;
        }
    }

    pub async fn emit(&self, event: ProtocolEvent) {
        if let Some(handler) = self.latest().await {
            handler.on_event(event).await;
        }
    }

    pub async fn fail(&self, message: &str) {
        if let Some(handler) = self.latest().await {
            handler.on_failure(message.to_string()).await;
        }
    }
}

/// A `participant-changed` event for participant `id` on extension `dn`.
pub fn participant_event(dn: &str, id: u32) -> ProtocolEvent {
    ProtocolEvent {
        sequence: None,
        kind: EventKind::ParticipantChanged,
        entity: participant_entity(dn, id),
    }
}

pub fn participant_entity(dn: &str, id: u32) -> String {
    format!("/callcontrol/{dn}/participants/{id}")
}

#[async_trait]
impl ProtocolConnector for MockConnector {
    async fn connect(
        &self,
        token: &str,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Box<dyn ProtocolLink>, OutdialError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(OutdialError::Protocol {
                message: "scripted handshake failure".into(),
                source: None,
            });
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().await.push(token.to_string());
        self.handlers.lock().await.push(handler);
        Ok(Box::new(MockLink {
            connected: AtomicBool::new(true),
            counters: Arc::clone(&self.counters),
        }))
    }
}

pub struct MockLink {
    connected: AtomicBool,
    counters: Arc<Counters>,
}

#[async_trait]
impl ProtocolLink for MockLink {
    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
