// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable campaign registry trait.

use async_trait::async_trait;

use crate::error::OutdialError;
use crate::types::{CampaignField, CampaignSnapshot};

/// Durable store of campaign snapshots, used for restart recovery and broadcasting.
#[async_trait]
pub trait CampaignRegistry: Send + Sync {
    async fn get(&self, campaign_id: &str) -> Result<Option<CampaignSnapshot>, OutdialError>;

    /// Insert or replace the whole snapshot.
    async fn save(&self, snapshot: &CampaignSnapshot) -> Result<(), OutdialError>;

    /// Apply a single field update. A missing entry is not an error.
    async fn update_field(
        &self,
        campaign_id: &str,
        field: CampaignField,
    ) -> Result<(), OutdialError>;

    async fn remove(&self, campaign_id: &str) -> Result<(), OutdialError>;

    async fn list_all_active(&self) -> Result<Vec<CampaignSnapshot>, OutdialError>;

    async fn list_all(&self) -> Result<Vec<CampaignSnapshot>, OutdialError>;
}
