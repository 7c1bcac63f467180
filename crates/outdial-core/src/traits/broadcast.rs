// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast sink trait for campaign snapshot fan-out.

use async_trait::async_trait;

use crate::error::OutdialError;
use crate::types::CampaignSnapshot;

/// Receives the full snapshot list whenever a campaign changes.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    async fn publish(
        &self,
        snapshots: &[CampaignSnapshot],
        changed_campaign_id: Option<&str>,
    ) -> Result<(), OutdialError>;
}
