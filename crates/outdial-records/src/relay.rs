// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification relay client.

use std::time::Duration;

use async_trait::async_trait;
use outdial_config::model::RelayConfig;
use outdial_core::types::RelayReceipt;
use outdial_core::{NotificationRelay, OutdialError};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct RelayPayload<'a> {
    description: &'a str,
    description2: &'a str,
    phone: &'a str,
}

/// Posts unanswered-call results to the primary and secondary relay endpoints.
///
/// An empty endpoint URL disables that endpoint. Without a primary endpoint
/// the relay reports itself disabled and nothing is posted.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    primary_url: String,
    secondary_url: String,
}

fn relay_error(message: String, source: Option<reqwest::Error>) -> OutdialError {
    OutdialError::Relay {
        message,
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}

impl RelayClient {
    pub fn new(
        primary_url: &str,
        secondary_url: &str,
        timeout: Duration,
    ) -> Result<Self, OutdialError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| relay_error(format!("failed to build HTTP client: {e}"), Some(e)))?;
        Ok(Self {
            client,
            primary_url: primary_url.to_string(),
            secondary_url: secondary_url.to_string(),
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, OutdialError> {
        Self::new(
            &config.primary_url,
            &config.secondary_url,
            Duration::from_secs(30),
        )
    }

    async fn post(
        &self,
        url: &str,
        payload: &RelayPayload<'_>,
    ) -> Result<reqwest::Response, OutdialError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| relay_error(format!("POST {url} failed: {e}"), Some(e)))?;

        let status = response.status();
        debug!(status = %status, url, "relay response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(relay_error(format!("POST {url} returned {status}: {body}"), None));
        }
        Ok(response)
    }
}

#[async_trait]
impl NotificationRelay for RelayClient {
    fn is_enabled(&self) -> bool {
        !self.primary_url.is_empty()
    }

    async fn relay_primary(
        &self,
        description: &str,
        description2: &str,
        phone: &str,
    ) -> Result<RelayReceipt, OutdialError> {
        if self.primary_url.is_empty() {
            return Err(relay_error("primary relay endpoint is not configured".into(), None));
        }
        let payload = RelayPayload {
            description,
            description2,
            phone,
        };
        let response = self.post(&self.primary_url, &payload).await?;
        response
            .json::<RelayReceipt>()
            .await
            .map_err(|e| relay_error(format!("failed to decode relay receipt: {e}"), Some(e)))
    }

    async fn relay_secondary(
        &self,
        description: &str,
        description2: &str,
        phone: &str,
    ) -> Result<(), OutdialError> {
        if self.secondary_url.is_empty() {
            debug!("secondary relay disabled");
            return Ok(());
        }
        let payload = RelayPayload {
            description,
            description2,
            phone,
        };
        self.post(&self.secondary_url, &payload).await.map(|_| ())
    }
}
