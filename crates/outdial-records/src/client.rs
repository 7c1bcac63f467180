// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the campaign-record service.
//!
//! Every endpoint is scoped under `/projects/{campaign_id}`; customer-level
//! writes live under `/projects/{campaign_id}/customers/{customer_id}`.

use std::time::Duration;

use async_trait::async_trait;
use outdial_config::model::RecordsConfig;
use outdial_core::types::{Candidate, CandidateStatus, OutcomeCode, VisitRecord};
use outdial_core::{OutdialError, RecordService};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Envelope of the candidate listing.
#[derive(Debug, Deserialize)]
struct CandidatePage {
    #[serde(default)]
    list: Vec<CandidateRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateRow {
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    customer: Option<CustomerDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerDetail {
    #[serde(default)]
    member_name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    description2: Option<String>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        let customer = row.customer.unwrap_or_default();
        Candidate {
            customer_id: row.customer_id,
            member_name: customer.member_name,
            phone: customer.phone,
            description: customer.description,
            description2: customer.description2,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallStatusBody {
    call_status: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoDialBody<'a> {
    call_flow_id: &'a str,
}

/// REST client for the campaign-record service.
#[derive(Clone)]
pub struct RecordClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for RecordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn service_error(message: String, source: Option<reqwest::Error>) -> OutdialError {
    OutdialError::RecordService {
        message,
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}

impl RecordClient {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, OutdialError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| service_error(format!("failed to build HTTP client: {e}"), Some(e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &RecordsConfig) -> Result<Self, OutdialError> {
        Self::new(
            &config.base_url,
            config.api_key.clone().map(SecretString::from),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// `{base}/projects/{campaign_id}/{segments...}` with each segment percent-encoded.
    fn project_url(&self, campaign_id: &str, segments: &[&str]) -> Result<Url, OutdialError> {
        let mut url = Url::parse(&format!("{}/projects", self.base_url)).map_err(|e| {
            OutdialError::RecordService {
                message: format!("invalid record service URL: {e}"),
                source: Some(Box::new(e)),
            }
        })?;
        url.path_segments_mut()
            .map_err(|()| service_error("record service URL cannot carry a path".into(), None))?
            .push(campaign_id)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header(AUTHORIZATION, format!("Bearer {}", key.expose_secret())),
            None => builder,
        }
    }

    /// Send a write and require a 2xx status. The body is ignored.
    async fn send_write(&self, builder: RequestBuilder, what: &str) -> Result<(), OutdialError> {
        let response = builder
            .send()
            .await
            .map_err(|e| service_error(format!("{what} failed: {e}"), Some(e)))?;
        let status = response.status();
        debug!(status = %status, what, "record service response");
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(service_error(format!("{what} returned {status}: {body}"), None))
    }
}

#[async_trait]
impl RecordService for RecordClient {
    async fn fetch_candidates(
        &self,
        call_flow_id: &str,
        campaign_id: &str,
        status: CandidateStatus,
        limit: usize,
    ) -> Result<Vec<Candidate>, OutdialError> {
        let mut url = self.project_url(campaign_id, &["customers"])?;
        url.query_pairs_mut()
            .append_pair("callFlowId", call_flow_id)
            .append_pair("callStatus", &status.to_string())
            .append_pair("limit", &limit.to_string());

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| service_error(format!("candidate fetch failed: {e}"), Some(e)))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(
                format!("candidate fetch returned {status_code}: {body}"),
                None,
            ));
        }

        let page = response
            .json::<CandidatePage>()
            .await
            .map_err(|e| service_error(format!("failed to decode candidates: {e}"), Some(e)))?;
        Ok(page.list.into_iter().map(Candidate::from).collect())
    }

    async fn report_call_status(
        &self,
        campaign_id: &str,
        customer_id: &str,
        code: OutcomeCode,
    ) -> Result<(), OutdialError> {
        let url = self.project_url(campaign_id, &["customers", customer_id, "call-status"])?;
        let builder = self.request(Method::PUT, url).json(&CallStatusBody {
            call_status: code.code(),
        });
        self.send_write(builder, "call status report").await
    }

    async fn increment_dial_attempt(
        &self,
        campaign_id: &str,
        customer_id: &str,
    ) -> Result<(), OutdialError> {
        let url = self.project_url(campaign_id, &["customers", customer_id, "dial-attempts"])?;
        self.send_write(self.request(Method::POST, url), "dial attempt increment")
            .await
    }

    async fn write_visit_record(&self, record: &VisitRecord) -> Result<(), OutdialError> {
        let url = self.project_url(
            &record.campaign_id,
            &["customers", &record.customer_id, "visits"],
        )?;
        let builder = self.request(Method::POST, url).json(record);
        self.send_write(builder, "visit record").await
    }

    async fn advance_auto_dial_marker(
        &self,
        campaign_id: &str,
        call_flow_id: &str,
    ) -> Result<(), OutdialError> {
        let url = self.project_url(campaign_id, &["auto-dial"])?;
        let builder = self
            .request(Method::PUT, url)
            .json(&AutoDialBody { call_flow_id });
        self.send_write(builder, "auto-dial marker").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_url_encodes_segments() {
        let client =
            RecordClient::new("http://records.local/api/", None, Duration::from_secs(5)).unwrap();
        let url = client
            .project_url("p 1", &["customers", "c/2", "visits"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://records.local/api/projects/p%201/customers/c%2F2/visits"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let client = RecordClient::new(
            "http://records.local",
            Some(SecretString::from("k-123".to_string())),
            Duration::from_secs(5),
        )
        .unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("k-123"));
    }
}
