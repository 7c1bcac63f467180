// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-extension call records awaiting write-back.
//!
//! Each extension owns at most one `current` record (the call most recently
//! placed) and at most one `pending` record (the call before it, waiting for
//! its outcome to be written back).

use std::collections::HashMap;

use outdial_core::types::{CallRecord, CallStatus};

#[derive(Debug, Default, Clone)]
pub struct CallLedger {
    current: HashMap<String, CallRecord>,
    pending: HashMap<String, CallRecord>,
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the `current` side from persisted records.
    pub fn from_current(records: impl IntoIterator<Item = CallRecord>) -> Self {
        Self {
            current: records.into_iter().map(|r| (r.dn.clone(), r)).collect(),
            pending: HashMap::new(),
        }
    }

    /// Move `current[dn]` into `pending[dn]`.
    ///
    /// Returns the record that occupied the pending slot before, which the
    /// caller must write back; a pending record is never dropped silently.
    pub fn archive_current(&mut self, dn: &str) -> Option<CallRecord> {
        let record = self.current.remove(dn)?;
        self.pending.insert(dn.to_string(), record)
    }

    /// Start tracking a freshly placed call. `current[dn]` must already be archived.
    pub fn begin(&mut self, record: CallRecord) {
        self.current.insert(record.dn.clone(), record);
    }

    pub fn take_pending(&mut self, dn: &str) -> Option<CallRecord> {
        self.pending.remove(dn)
    }

    /// Update the status of `current[dn]`. Returns true when it changed.
    pub fn update_status(&mut self, dn: &str, status: CallStatus) -> bool {
        match self.current.get_mut(dn) {
            Some(record) if record.status != status => {
                record.status = status;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self, dn: &str) -> Option<&CallRecord> {
        self.current.get(dn)
    }

    pub fn pending(&self, dn: &str) -> Option<&CallRecord> {
        self.pending.get(dn)
    }

    /// Current records sorted by extension, for persistence and broadcasting.
    pub fn current_records(&self) -> Vec<CallRecord> {
        let mut records: Vec<_> = self.current.values().cloned().collect();
        records.sort_by(|a, b| a.dn.cmp(&b.dn));
        records
    }

    /// Empty the ledger, returning every record that still needs write-back:
    /// all pending records followed by all current ones.
    pub fn drain_all(&mut self) -> Vec<CallRecord> {
        let mut pending: Vec<_> = self.pending.drain().map(|(_, r)| r).collect();
        pending.sort_by(|a, b| a.dn.cmp(&b.dn));
        let mut current: Vec<_> = self.current.drain().map(|(_, r)| r).collect();
        current.sort_by(|a, b| a.dn.cmp(&b.dn));
        pending.extend(current);
        pending
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use outdial_core::types::QueueItem;

    use super::*;

    fn record(customer: &str, dn: &str) -> CallRecord {
        let item = QueueItem {
            campaign_id: "p1".into(),
            customer_id: customer.into(),
            member_name: customer.to_uppercase(),
            phone: format!("09{customer}"),
            description: String::new(),
            description2: String::new(),
        };
        CallRecord::dialing(&item, dn, Utc::now())
    }

    #[test]
    fn archive_moves_current_to_pending() {
        let mut ledger = CallLedger::new();
        ledger.begin(record("c1", "101"));
        assert!(ledger.archive_current("101").is_none());
        assert!(ledger.current("101").is_none());
        assert_eq!(ledger.pending("101").unwrap().customer_id, "c1");
    }

    #[test]
    fn archive_returns_displaced_pending() {
        let mut ledger = CallLedger::new();
        ledger.begin(record("c1", "101"));
        ledger.archive_current("101");
        ledger.begin(record("c2", "101"));
        let displaced = ledger.archive_current("101").unwrap();
        assert_eq!(displaced.customer_id, "c1");
        assert_eq!(ledger.pending("101").unwrap().customer_id, "c2");
    }

    #[test]
    fn at_most_one_record_per_slot() {
        let mut ledger = CallLedger::new();
        let mut displaced = 0;
        for i in 0..10 {
            if ledger.archive_current("101").is_some() {
                displaced += 1;
            }
            ledger.begin(record(&format!("c{i}"), "101"));
            ledger.begin(record(&format!("d{i}"), "102"));
        }
        assert_eq!(ledger.current_records().len(), 2);
        assert_eq!(displaced, 8);
        assert_eq!(ledger.drain_all().len(), 3);
        assert!(ledger.is_empty());
    }

    #[test]
    fn update_status_reports_change() {
        let mut ledger = CallLedger::new();
        ledger.begin(record("c1", "101"));
        assert!(!ledger.update_status("101", CallStatus::Dialing));
        assert!(ledger.update_status("101", CallStatus::Connected));
        assert!(!ledger.update_status("999", CallStatus::Connected));
        assert_eq!(ledger.current("101").unwrap().status, CallStatus::Connected);
    }
}
