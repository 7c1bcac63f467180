// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compare-and-swap guard that lets at most one task run a section at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flight. `None` while another holder is alive.
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn in_flight(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the flight on drop, including on panic or early return.
#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_drop() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire().unwrap();
        assert!(flight.in_flight());
        assert!(flight.try_acquire().is_none());
        drop(guard);
        assert!(!flight.in_flight());
        assert!(flight.try_acquire().is_some());
    }

    #[tokio::test]
    async fn guard_moves_into_task() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire().unwrap();
        let handle = tokio::spawn(async move {
            let _guard = guard;
        });
        handle.await.unwrap();
        assert!(!flight.in_flight());
    }
}
