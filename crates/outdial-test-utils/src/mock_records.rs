// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording doubles for the campaign-record service and notification relay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use outdial_core::types::{
    Candidate, CandidateStatus, OutcomeCode, RelayReceipt, VisitRecord,
};
use outdial_core::{NotificationRelay, OutdialError, RecordService};

/// One call made against [`MockRecordService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordCall {
    Fetch { status: String, limit: usize },
    Status { customer_id: String, code: u8 },
    DialAttempt { customer_id: String },
    Visit {
        customer_id: String,
        title: String,
        visited_at: DateTime<Utc>,
    },
    AutoDialMarker { call_flow_id: String },
}

/// A complete candidate with phone `09{customer_id}`.
pub fn candidate(customer_id: &str) -> Candidate {
    Candidate {
        customer_id: Some(customer_id.to_string()),
        member_name: Some(customer_id.to_uppercase()),
        phone: Some(format!("09{customer_id}")),
        description: None,
        description2: None,
    }
}

/// A candidate carrying both descriptions, so its failed calls are relayed.
pub fn described_candidate(customer_id: &str) -> Candidate {
    Candidate {
        description: Some(format!("{customer_id}-d1")),
        description2: Some(format!("{customer_id}-d2")),
        ..candidate(customer_id)
    }
}

/// Serves fixed candidate lists per status and records every write.
///
/// Fetches do not consume candidates, like a service that keeps returning a
/// row until its call status changes.
#[derive(Default)]
pub struct MockRecordService {
    candidates: Mutex<HashMap<String, Vec<Candidate>>>,
    calls: Mutex<Vec<RecordCall>>,
    fail_writes: AtomicBool,
}

impl MockRecordService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_candidates(&self, status: CandidateStatus, candidates: Vec<Candidate>) {
        self.candidates
            .lock()
            .await
            .insert(status.to_string(), candidates);
    }

    /// Make every write fail with a record service error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<RecordCall> {
        self.calls.lock().await.clone()
    }

    /// Outcome codes reported for `customer_id`, in order.
    pub async fn reported(&self, customer_id: &str) -> Vec<u8> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordCall::Status { customer_id: id, code } if id == customer_id => Some(*code),
                _ => None,
            })
            .collect()
    }

    async fn record_write(&self, call: RecordCall) -> Result<(), OutdialError> {
        self.calls.lock().await.push(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OutdialError::RecordService {
                message: "scripted failure".into(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordService for MockRecordService {
    async fn fetch_candidates(
        &self,
        _call_flow_id: &str,
        _campaign_id: &str,
        status: CandidateStatus,
        limit: usize,
    ) -> Result<Vec<Candidate>, OutdialError> {
        self.calls.lock().await.push(RecordCall::Fetch {
            status: status.to_string(),
            limit,
        });
        let candidates = self.candidates.lock().await;
        Ok(candidates
            .get(&status.to_string())
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn report_call_status(
        &self,
        _campaign_id: &str,
        customer_id: &str,
        code: OutcomeCode,
    ) -> Result<(), OutdialError> {
        self.record_write(RecordCall::Status {
            customer_id: customer_id.to_string(),
            code: code.code(),
        })
        .await
    }

    async fn increment_dial_attempt(
        &self,
        _campaign_id: &str,
        customer_id: &str,
    ) -> Result<(), OutdialError> {
        self.record_write(RecordCall::DialAttempt {
            customer_id: customer_id.to_string(),
        })
        .await
    }

    async fn write_visit_record(&self, record: &VisitRecord) -> Result<(), OutdialError> {
        self.record_write(RecordCall::Visit {
            customer_id: record.customer_id.clone(),
            title: record.title.clone(),
            visited_at: record.visited_at,
        })
        .await
    }

    async fn advance_auto_dial_marker(
        &self,
        _campaign_id: &str,
        call_flow_id: &str,
    ) -> Result<(), OutdialError> {
        self.record_write(RecordCall::AutoDialMarker {
            call_flow_id: call_flow_id.to_string(),
        })
        .await
    }
}

/// How [`MockRelay::relay_primary`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryBehavior {
    Accept,
    /// Transport succeeds but the payload is rejected.
    Reject,
    /// Transport failure.
    Fail,
}

pub struct MockRelay {
    behavior: Mutex<PrimaryBehavior>,
    enabled: bool,
    primary_calls: AtomicUsize,
    secondary_calls: AtomicUsize,
}

impl MockRelay {
    pub fn new(behavior: PrimaryBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            enabled: true,
            primary_calls: AtomicUsize::new(0),
            secondary_calls: AtomicUsize::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(PrimaryBehavior::Fail)
        }
    }

    pub async fn set_behavior(&self, behavior: PrimaryBehavior) {
        *self.behavior.lock().await = behavior;
    }

    pub fn primary_calls(&self) -> usize {
        self.primary_calls.load(Ordering::SeqCst)
    }

    pub fn secondary_calls(&self) -> usize {
        self.secondary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationRelay for MockRelay {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn relay_primary(
        &self,
        _description: &str,
        _description2: &str,
        _phone: &str,
    ) -> Result<RelayReceipt, OutdialError> {
        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        match *self.behavior.lock().await {
            PrimaryBehavior::Accept => Ok(RelayReceipt {
                status_code: 0,
                message: "Success".into(),
            }),
            PrimaryBehavior::Reject => Ok(RelayReceipt {
                status_code: 7,
                message: "Rejected".into(),
            }),
            PrimaryBehavior::Fail => Err(OutdialError::Relay {
                message: "scripted transport failure".into(),
                source: None,
            }),
        }
    }

    async fn relay_secondary(
        &self,
        _description: &str,
        _description2: &str,
        _phone: &str,
    ) -> Result<(), OutdialError> {
        self.secondary_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
