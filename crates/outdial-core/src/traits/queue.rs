// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call queue store trait.

use async_trait::async_trait;

use crate::error::OutdialError;
use crate::types::QueueItem;

/// Per-campaign FIFO of customers to dial, with a "used" set of popped entries.
///
/// A popped item stays in the used set until [`remove_used`](CallQueueStore::remove_used),
/// so it still counts toward depth and still blocks duplicate inserts.
#[async_trait]
pub trait CallQueueStore: Send + Sync {
    /// Atomically take the oldest pending item and move it to the used set.
    async fn pop_next(&self, campaign_id: &str) -> Result<Option<QueueItem>, OutdialError>;

    /// Pending plus used entries.
    async fn count(&self, campaign_id: &str) -> Result<usize, OutdialError>;

    /// Whether the customer is pending or used.
    async fn exists(&self, campaign_id: &str, customer_id: &str) -> Result<bool, OutdialError>;

    /// Insert items not already present, stopping once depth reaches `cap`.
    /// Returns the number inserted.
    async fn insert_distinct(
        &self,
        items: Vec<QueueItem>,
        cap: usize,
    ) -> Result<usize, OutdialError>;

    async fn remove_used(&self, campaign_id: &str, customer_id: &str)
    -> Result<(), OutdialError>;

    /// Drop every entry of one campaign. Returns the number removed.
    async fn clear(&self, campaign_id: &str) -> Result<usize, OutdialError>;

    /// Drop every entry of every campaign. Returns the number removed.
    async fn clear_all(&self) -> Result<usize, OutdialError>;
}
