// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call queue replenishment.
//!
//! The queue is topped up from the record service whenever its depth drops
//! below [`LOW_WATER_PER_AGENT`] entries per extension, never growing past
//! [`CAP_PER_AGENT`] per extension.

use std::collections::HashSet;

use outdial_core::types::{CandidateStatus, QueueItem};
use outdial_core::{CallQueueStore, OutdialError, RecordService};
use tracing::{debug, info, warn};

pub const LOW_WATER_PER_AGENT: usize = 2;
pub const CAP_PER_AGENT: usize = 3;
pub const FETCH_PER_AGENT: usize = 5;

/// Where a replenishment run fetches from.
pub struct Replenisher<'a> {
    pub queue: &'a dyn CallQueueStore,
    pub records: &'a dyn RecordService,
}

impl Replenisher<'_> {
    /// Top up the campaign's queue. Returns the number of items inserted.
    pub async fn replenish(
        &self,
        campaign_id: &str,
        call_flow_id: &str,
        agent_count: usize,
    ) -> Result<usize, OutdialError> {
        if agent_count == 0 {
            return Ok(0);
        }

        let depth = self.queue.count(campaign_id).await?;
        if depth >= agent_count * LOW_WATER_PER_AGENT {
            debug!(campaign_id, depth, "queue above low water, skipping replenish");
            return Ok(0);
        }

        let cap = agent_count * CAP_PER_AGENT;
        let space = cap.saturating_sub(depth);
        let limit = agent_count * FETCH_PER_AGENT;

        let mut candidates = self
            .records
            .fetch_candidates(call_flow_id, campaign_id, CandidateStatus::Pending, limit)
            .await?;
        if candidates.is_empty() {
            candidates = self
                .records
                .fetch_candidates(call_flow_id, campaign_id, CandidateStatus::Failed, limit)
                .await?;
        }
        if candidates.is_empty() {
            warn!(campaign_id, "no candidates left to dial");
            return Ok(0);
        }

        let mut seen = HashSet::new();
        let mut items: Vec<QueueItem> = Vec::with_capacity(space);
        for candidate in candidates {
            if items.len() >= space {
                break;
            }
            let Some(item) = candidate.into_queue_item(campaign_id) else {
                continue;
            };
            if !seen.insert(item.customer_id.clone()) {
                continue;
            }
            if self.queue.exists(campaign_id, &item.customer_id).await? {
                continue;
            }
            items.push(item);
        }

        if items.is_empty() {
            warn!(campaign_id, "all fetched candidates were duplicates or incomplete");
            return Ok(0);
        }

        let inserted = self.queue.insert_distinct(items, cap).await?;
        info!(campaign_id, depth, inserted, cap, "call queue replenished");
        Ok(inserted)
    }
}
