// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Outdial campaign dialer.

use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all Outdial collaborator traits and the orchestrator.
#[derive(Debug, Error)]
pub enum OutdialError {
    /// Configuration errors (invalid TOML, missing campaign fields, bad window syntax).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Telephony control-plane errors (REST failure, unexpected status, decode failure).
    #[error("control plane error: {message}")]
    ControlPlane {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Campaign-record service errors.
    #[error("record service error: {message}")]
    RecordService {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Notification relay transport errors.
    #[error("relay error: {message}")]
    Relay {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Persistent protocol connection errors (handshake, reconnect exhaustion).
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No usable access credential for the campaign.
    #[error("credential error: {0}")]
    Credential(String),

    /// An inbound protocol frame could not be decoded.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// How a failure is treated by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Fatal to a campaign's start.
    Configuration,
    /// Logged, surfaced as advisory, retried on the next trigger.
    TransientExternal,
    /// Handled by auto-reconnect; exhaustion surfaces as advisory.
    Protocol,
    /// Logged and discarded.
    DataIntegrity,
    /// Logged; the queue entry is still retired.
    WriteBack,
}

impl OutdialError {
    /// Map this error onto the orchestrator's failure taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            OutdialError::Config(_) => ErrorCategory::Configuration,
            OutdialError::Storage { .. }
            | OutdialError::ControlPlane { .. }
            | OutdialError::Credential(_)
            | OutdialError::Timeout { .. }
            | OutdialError::Internal(_) => ErrorCategory::TransientExternal,
            OutdialError::Protocol { .. } => ErrorCategory::Protocol,
            OutdialError::MalformedFrame(_) => ErrorCategory::DataIntegrity,
            OutdialError::RecordService { .. } | OutdialError::Relay { .. } => {
                ErrorCategory::WriteBack
            }
        }
    }
}
