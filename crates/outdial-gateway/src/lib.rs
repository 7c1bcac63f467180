// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command channel and broadcast gateway for the Outdial dialer.
//!
//! Dashboard clients connect to `/ws`, send start/stop commands, and receive
//! the full campaign snapshot list whenever a campaign changes.

pub mod broadcast;
pub mod commands;
pub mod server;
pub mod ws;

pub use broadcast::WsBroadcaster;
pub use commands::{ClientCommand, ServerEvent};
pub use server::{GatewayState, ServerConfig, router, start_server};
