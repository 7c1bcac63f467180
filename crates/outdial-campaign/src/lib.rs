// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign orchestration for the Outdial dialer.
//!
//! [`Dialer`] accepts start/stop commands and owns the directory of running
//! [`Campaign`]s. Each campaign reacts to protocol events and its idle poller
//! by running serialized decision cycles: refresh the roster, check the
//! recurrence and restricted windows, pop the next customer and place a call.

pub mod campaign;
pub mod idle;
pub mod ledger;
pub mod lifecycle;
pub mod queue;
pub mod schedule;
pub mod settings;
pub mod single_flight;
pub mod window;

pub use campaign::{Campaign, CampaignDeps, DialMode, ParticipantSnapshot};
pub use lifecycle::{CampaignDirectory, Dialer, RecoveryReport, validate_config};
pub use settings::CampaignSettings;
