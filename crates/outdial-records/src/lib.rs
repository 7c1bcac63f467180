// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound write-back clients for Outdial.
//!
//! - [`RecordClient`]: campaign-record service, implementing [`outdial_core::RecordService`]
//! - [`RelayClient`]: notification relay, implementing [`outdial_core::NotificationRelay`]

pub mod client;
pub mod relay;

pub use client::RecordClient;
pub use relay::RelayClient;
