// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Outdial integration tests.
//!
//! Provides scriptable doubles for every collaborator trait so the campaign
//! orchestrator can be exercised without a telephony system, record service,
//! or database.
//!
//! # Components
//!
//! - [`MockControlPlane`] - roster, participants and call capture
//! - [`MockRecordService`] / [`MockRelay`] - write-back recording
//! - [`MemoryRegistry`] / [`MemoryQueue`] / [`RecordingBroadcast`] - in-memory stores
//! - [`MockConnector`] - protocol connection with injected frames

pub mod memory;
pub mod mock_connector;
pub mod mock_control;
pub mod mock_records;

use std::future::Future;
use std::time::Duration;

pub use memory::{MemoryQueue, MemoryRegistry, Published, RecordingBroadcast};
pub use mock_connector::{MockConnector, MockLink, participant_entity, participant_event};
pub use mock_control::{MockControlPlane, PlacedCall, busy_extension, idle_extension};
pub use mock_records::{
    MockRecordService, MockRelay, PrimaryBehavior, RecordCall, candidate, described_candidate,
};

/// Poll `check` every 10ms until it returns true, panicking after `timeout`.
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
