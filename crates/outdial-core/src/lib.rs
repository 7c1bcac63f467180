// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Outdial campaign dialer.
//!
//! This crate provides the collaborator traits, error types, and domain types
//! used throughout the Outdial workspace. The orchestrator depends only on the
//! traits defined here; concrete clients and stores implement them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorCategory, OutdialError};
pub use types::{CampaignState, CallStatus, EventKind};

pub use traits::{
    BroadcastSink, CallQueueStore, CampaignRegistry, ControlPlane, FrameHandler,
    NotificationRelay, ProtocolConnector, ProtocolLink, RecordService,
};
