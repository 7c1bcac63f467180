// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony control-plane trait.

use async_trait::async_trait;

use crate::error::OutdialError;
use crate::types::{AgentProfile, Extension, Participant, TokenGrant};

/// REST surface of the telephony system that owns extensions and places calls.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Exchange client credentials for an access token.
    async fn issue_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, OutdialError>;

    /// Full roster of extensions with their live participants.
    async fn list_extensions(&self, token: &str) -> Result<Vec<Extension>, OutdialError>;

    /// Look up a participant by entity address. `Ok(None)` when it no longer exists.
    async fn get_participant(
        &self,
        token: &str,
        entity: &str,
    ) -> Result<Option<Participant>, OutdialError>;

    /// Place an outbound call from `device_id` on extension `dn`.
    async fn place_call(
        &self,
        token: &str,
        dn: &str,
        device_id: &str,
        destination: &str,
    ) -> Result<(), OutdialError>;

    /// Availability profile of the agent behind `dn`.
    async fn agent_profile(&self, token: &str, dn: &str) -> Result<AgentProfile, OutdialError>;
}
