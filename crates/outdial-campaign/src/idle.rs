// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-rescheduling idle poller with exponential backoff.
//!
//! Each tick asks a probe whether any extension is idle and outside its
//! cooldown. Activity resets the interval to its minimum; a quiet tick
//! multiplies it by the backoff factor, capped at the maximum.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use outdial_core::types::Extension;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Interval state of the idle poller.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleBackoff {
    current: Duration,
    min: Duration,
    max: Duration,
    factor: f64,
}

impl IdleBackoff {
    pub fn new(min: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: min,
            min,
            max: max.max(min),
            factor: factor.max(1.0),
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn on_activity(&mut self) -> Duration {
        self.current = self.min;
        self.current
    }

    pub fn on_quiet(&mut self) -> Duration {
        self.current = self.current.mul_f64(self.factor).min(self.max);
        self.current
    }
}

/// Whether some extension is idle and its last decision is older than `cooldown`.
pub fn has_ready_extension(
    agents: &[Extension],
    last_execution: &HashMap<String, DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    agents.iter().filter(|ext| ext.is_idle()).any(|ext| {
        match last_execution.get(&ext.dn) {
            None => true,
            Some(last) => (now - *last)
                .to_std()
                .map(|elapsed| elapsed >= cooldown)
                // Timestamps in the future count as still cooling down.
                .unwrap_or(false),
        }
    })
}

/// Uniform random delay in `[min, max]`.
pub fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

/// Run the poller until `cancel` fires.
///
/// `probe` returns true when it found a ready extension and scheduled a dial.
pub async fn run_idle_poller<F, Fut>(
    campaign_id: String,
    mut backoff: IdleBackoff,
    cancel: CancellationToken,
    mut probe: F,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = bool> + Send,
{
    info!(
        campaign_id = %campaign_id,
        initial_ms = backoff.current().as_millis() as u64,
        "idle poller started"
    );
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(backoff.current()) => {}
        }
        let next = if probe().await {
            backoff.on_activity()
        } else {
            backoff.on_quiet()
        };
        debug!(campaign_id = %campaign_id, next_ms = next.as_millis() as u64, "idle poll rescheduled");
    }
    info!(campaign_id = %campaign_id, "idle poller stopped");
}
