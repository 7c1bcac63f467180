// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony control plane integration for Outdial.
//!
//! - [`ControlPlaneClient`]: REST client implementing [`outdial_core::ControlPlane`]
//! - [`CredentialManager`]: per-campaign access token lifecycle
//! - [`WsConnector`]: event WebSocket implementing [`outdial_core::ProtocolConnector`]

pub mod control;
pub mod credentials;
pub mod frame;
pub mod ws;

pub use control::ControlPlaneClient;
pub use credentials::{CredentialManager, IssuedToken};
pub use ws::{WsConnector, WsLink, WsSettings};
