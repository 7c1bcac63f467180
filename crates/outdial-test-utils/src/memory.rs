// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory registry, call queue and broadcast sink.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use outdial_core::types::{CampaignField, CampaignSnapshot, CampaignState, QueueItem};
use outdial_core::{BroadcastSink, CallQueueStore, CampaignRegistry, OutdialError};

#[derive(Default)]
pub struct MemoryRegistry {
    entries: Mutex<HashMap<String, CampaignSnapshot>>,
    failing_removals: Mutex<HashSet<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, campaign_id: &str) -> bool {
        self.entries.lock().await.contains_key(campaign_id)
    }

    /// Make every later `remove` of `campaign_id` fail.
    pub async fn fail_removal(&self, campaign_id: &str) {
        self.failing_removals
            .lock()
            .await
            .insert(campaign_id.to_string());
    }
}

#[async_trait]
impl CampaignRegistry for MemoryRegistry {
    async fn get(&self, campaign_id: &str) -> Result<Option<CampaignSnapshot>, OutdialError> {
        Ok(self.entries.lock().await.get(campaign_id).cloned())
    }

    async fn save(&self, snapshot: &CampaignSnapshot) -> Result<(), OutdialError> {
        self.entries
            .lock()
            .await
            .insert(snapshot.campaign_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn update_field(
        &self,
        campaign_id: &str,
        field: CampaignField,
    ) -> Result<(), OutdialError> {
        if let Some(snapshot) = self.entries.lock().await.get_mut(campaign_id) {
            field.apply(snapshot);
            snapshot.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn remove(&self, campaign_id: &str) -> Result<(), OutdialError> {
        if self.failing_removals.lock().await.contains(campaign_id) {
            return Err(OutdialError::Storage {
                source: format!("remove {campaign_id} failed").into(),
            });
        }
        self.entries.lock().await.remove(campaign_id);
        Ok(())
    }

    async fn list_all_active(&self) -> Result<Vec<CampaignSnapshot>, OutdialError> {
        let mut list: Vec<_> = self
            .entries
            .lock()
            .await
            .values()
            .filter(|s| s.state == CampaignState::Active)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.campaign_id.cmp(&b.campaign_id));
        Ok(list)
    }

    async fn list_all(&self) -> Result<Vec<CampaignSnapshot>, OutdialError> {
        let mut list: Vec<_> = self.entries.lock().await.values().cloned().collect();
        list.sort_by(|a, b| a.campaign_id.cmp(&b.campaign_id));
        Ok(list)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    item: QueueItem,
    used: bool,
}

/// FIFO per campaign with an in-place "used" flag, mirroring the SQLite store.
#[derive(Default)]
pub struct MemoryQueue {
    entries: Mutex<HashMap<String, Vec<Entry>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Customer ids still waiting to be dialed, oldest first.
    pub async fn pending_ids(&self, campaign_id: &str) -> Vec<String> {
        self.ids(campaign_id, false).await
    }

    /// Customer ids popped but not yet retired.
    pub async fn used_ids(&self, campaign_id: &str) -> Vec<String> {
        self.ids(campaign_id, true).await
    }

    async fn ids(&self, campaign_id: &str, used: bool) -> Vec<String> {
        self.entries
            .lock()
            .await
            .get(campaign_id)
            .map(|list| {
                list.iter()
                    .filter(|e| e.used == used)
                    .map(|e| e.item.customer_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl CallQueueStore for MemoryQueue {
    async fn pop_next(&self, campaign_id: &str) -> Result<Option<QueueItem>, OutdialError> {
        let mut entries = self.entries.lock().await;
        let Some(list) = entries.get_mut(campaign_id) else {
            return Ok(None);
        };
        Ok(list.iter_mut().find(|e| !e.used).map(|e| {
            e.used = true;
            e.item.clone()
        }))
    }

    async fn count(&self, campaign_id: &str) -> Result<usize, OutdialError> {
        Ok(self
            .entries
            .lock()
            .await
            .get(campaign_id)
            .map_or(0, Vec::len))
    }

    async fn exists(&self, campaign_id: &str, customer_id: &str) -> Result<bool, OutdialError> {
        Ok(self
            .entries
            .lock()
            .await
            .get(campaign_id)
            .is_some_and(|list| list.iter().any(|e| e.item.customer_id == customer_id)))
    }

    async fn insert_distinct(
        &self,
        items: Vec<QueueItem>,
        cap: usize,
    ) -> Result<usize, OutdialError> {
        let mut entries = self.entries.lock().await;
        let mut inserted = 0;
        for item in items {
            let list = entries.entry(item.campaign_id.clone()).or_default();
            if list.len() >= cap {
                continue;
            }
            if list.iter().any(|e| e.item.customer_id == item.customer_id) {
                continue;
            }
            list.push(Entry { item, used: false });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn remove_used(&self, campaign_id: &str, customer_id: &str) -> Result<(), OutdialError> {
        if let Some(list) = self.entries.lock().await.get_mut(campaign_id) {
            list.retain(|e| !(e.used && e.item.customer_id == customer_id));
        }
        Ok(())
    }

    async fn clear(&self, campaign_id: &str) -> Result<usize, OutdialError> {
        Ok(self
            .entries
            .lock()
            .await
            .remove(campaign_id)
            .map_or(0, |list| list.len()))
    }

    async fn clear_all(&self) -> Result<usize, OutdialError> {
        let mut entries = self.entries.lock().await;
        let total = entries.values().map(Vec::len).sum();
        entries.clear();
        Ok(total)
    }
}

/// One captured publish.
#[derive(Debug, Clone)]
pub struct Published {
    pub snapshots: Vec<CampaignSnapshot>,
    pub changed: Option<String>,
}

#[derive(Default)]
pub struct RecordingBroadcast {
    published: Mutex<Vec<Published>>,
}

impl RecordingBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<Published> {
        self.published.lock().await.clone()
    }

    pub async fn last(&self) -> Option<Published> {
        self.published.lock().await.last().cloned()
    }
}

#[async_trait]
impl BroadcastSink for RecordingBroadcast {
    async fn publish(
        &self,
        snapshots: &[CampaignSnapshot],
        changed_campaign_id: Option<&str>,
    ) -> Result<(), OutdialError> {
        self.published.lock().await.push(Published {
            snapshots: snapshots.to_vec(),
            changed: changed_campaign_id.map(str::to_string),
        });
        Ok(())
    }
}
