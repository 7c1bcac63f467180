// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent protocol connection traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OutdialError;
use crate::types::ProtocolEvent;

/// Receives connection lifecycle notifications and decoded frames.
///
/// Implementations must return quickly; the connection's read loop waits on them.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// The connection opened. `reconnected` is false for the first open.
    async fn on_open(&self, reconnected: bool);

    async fn on_event(&self, event: ProtocolEvent);

    /// Reconnect attempts were exhausted. The link is dead.
    async fn on_failure(&self, message: String);
}

/// Opens authenticated protocol connections.
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
    async fn connect(
        &self,
        token: &str,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Box<dyn ProtocolLink>, OutdialError>;
}

/// Handle to one live connection.
#[async_trait]
pub trait ProtocolLink: Send + Sync {
    /// Close the connection and stop reconnecting. Idempotent.
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
