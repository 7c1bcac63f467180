// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the campaign orchestrator.
//!
//! Each external system the dialer talks to sits behind one of these traits,
//! so the orchestrator can be driven by in-memory doubles in tests.

pub mod broadcast;
pub mod control_plane;
pub mod protocol;
pub mod queue;
pub mod records;
pub mod registry;

pub use broadcast::BroadcastSink;
pub use control_plane::ControlPlane;
pub use protocol::{FrameHandler, ProtocolConnector, ProtocolLink};
pub use queue::CallQueueStore;
pub use records::{NotificationRelay, RecordService};
pub use registry::CampaignRegistry;
