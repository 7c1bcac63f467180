// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign-record service and notification relay traits.

use async_trait::async_trait;

use crate::error::OutdialError;
use crate::types::{Candidate, CandidateStatus, OutcomeCode, RelayReceipt, VisitRecord};

/// External system of record for campaign customers and call outcomes.
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Fetch up to `limit` candidates with the given call status.
    async fn fetch_candidates(
        &self,
        call_flow_id: &str,
        campaign_id: &str,
        status: CandidateStatus,
        limit: usize,
    ) -> Result<Vec<Candidate>, OutdialError>;

    async fn report_call_status(
        &self,
        campaign_id: &str,
        customer_id: &str,
        code: OutcomeCode,
    ) -> Result<(), OutdialError>;

    async fn increment_dial_attempt(
        &self,
        campaign_id: &str,
        customer_id: &str,
    ) -> Result<(), OutdialError>;

    async fn write_visit_record(&self, record: &VisitRecord) -> Result<(), OutdialError>;

    /// Move the campaign's auto-dial progress marker forward.
    async fn advance_auto_dial_marker(
        &self,
        campaign_id: &str,
        call_flow_id: &str,
    ) -> Result<(), OutdialError>;
}

/// Downstream notification endpoints fed with unanswered-call results.
#[async_trait]
pub trait NotificationRelay: Send + Sync {
    /// False when no primary endpoint is configured; callers skip relaying entirely.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Transport failure is an error; a rejected payload is a receipt without business success.
    async fn relay_primary(
        &self,
        description: &str,
        description2: &str,
        phone: &str,
    ) -> Result<RelayReceipt, OutdialError>;

    async fn relay_secondary(
        &self,
        description: &str,
        description2: &str,
        phone: &str,
    ) -> Result<(), OutdialError>;
}
