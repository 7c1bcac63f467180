// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of the call queue store and campaign registry.

use async_trait::async_trait;
use tracing::debug;

use outdial_core::types::{CampaignField, CampaignSnapshot, QueueItem};
use outdial_core::{CallQueueStore, CampaignRegistry, CampaignState, OutdialError};

use crate::database::Database;
use crate::queries::{call_queue, campaigns};

/// SQLite-backed call queue.
#[derive(Clone)]
pub struct SqliteCallQueue {
    db: Database,
}

impl SqliteCallQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CallQueueStore for SqliteCallQueue {
    async fn pop_next(&self, campaign_id: &str) -> Result<Option<QueueItem>, OutdialError> {
        call_queue::pop_next(&self.db, campaign_id).await
    }

    async fn count(&self, campaign_id: &str) -> Result<usize, OutdialError> {
        call_queue::count(&self.db, campaign_id).await
    }

    async fn exists(&self, campaign_id: &str, customer_id: &str) -> Result<bool, OutdialError> {
        call_queue::exists(&self.db, campaign_id, customer_id).await
    }

    async fn insert_distinct(
        &self,
        items: Vec<QueueItem>,
        cap: usize,
    ) -> Result<usize, OutdialError> {
        let offered = items.len();
        let inserted = call_queue::insert_distinct(&self.db, items, cap).await?;
        debug!(offered, inserted, cap, "call queue insert");
        Ok(inserted)
    }

    async fn remove_used(
        &self,
        campaign_id: &str,
        customer_id: &str,
    ) -> Result<(), OutdialError> {
        call_queue::remove_used(&self.db, campaign_id, customer_id).await
    }

    async fn clear(&self, campaign_id: &str) -> Result<usize, OutdialError> {
        call_queue::clear(&self.db, campaign_id).await
    }

    async fn clear_all(&self) -> Result<usize, OutdialError> {
        call_queue::clear_all(&self.db).await
    }
}

/// SQLite-backed campaign registry.
#[derive(Clone)]
pub struct SqliteRegistry {
    db: Database,
}

impl SqliteRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CampaignRegistry for SqliteRegistry {
    async fn get(&self, campaign_id: &str) -> Result<Option<CampaignSnapshot>, OutdialError> {
        campaigns::get(&self.db, campaign_id).await
    }

    async fn save(&self, snapshot: &CampaignSnapshot) -> Result<(), OutdialError> {
        campaigns::save(&self.db, snapshot).await
    }

    async fn update_field(
        &self,
        campaign_id: &str,
        field: CampaignField,
    ) -> Result<(), OutdialError> {
        if !campaigns::update_field(&self.db, campaign_id, field).await? {
            debug!(campaign_id, "field update for unknown campaign ignored");
        }
        Ok(())
    }

    async fn remove(&self, campaign_id: &str) -> Result<(), OutdialError> {
        campaigns::remove(&self.db, campaign_id).await?;
        Ok(())
    }

    async fn list_all_active(&self) -> Result<Vec<CampaignSnapshot>, OutdialError> {
        campaigns::list(&self.db, Some(&CampaignState::Active.to_string())).await
    }

    async fn list_all(&self) -> Result<Vec<CampaignSnapshot>, OutdialError> {
        campaigns::list(&self.db, None).await
    }
}
