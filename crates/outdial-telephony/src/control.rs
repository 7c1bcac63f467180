// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the telephony control plane.
//!
//! Provides [`ControlPlaneClient`] which handles token issuance, roster and
//! participant queries, call placement, and retry of transient failures on
//! idempotent reads.

use std::time::Duration;

use async_trait::async_trait;
use outdial_config::model::TelephonyConfig;
use outdial_core::types::{AgentProfile, Extension, Participant, TokenGrant};
use outdial_core::{ControlPlane, OutdialError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Envelope of the user directory query.
#[derive(Debug, Deserialize)]
struct UserPage {
    #[serde(default)]
    value: Vec<AgentProfile>,
}

/// REST client for the telephony control plane.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl ControlPlaneClient {
    /// Creates a client rooted at `base_url` (no trailing path).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OutdialError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OutdialError::ControlPlane {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    pub fn from_config(config: &TelephonyConfig) -> Result<Self, OutdialError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a JSON resource with a bearer token. `Ok(None)` on 404.
    ///
    /// Retries once on 429/5xx after a one second pause.
    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: Url,
    ) -> Result<Option<T>, OutdialError> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .get(url.clone())
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .send()
                .await
                .map_err(|e| OutdialError::ControlPlane {
                    message: format!("GET {} failed: {e}", url.path()),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, path = url.path(), attempt, "control plane response");

            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status.is_success() {
                let body = response.json::<T>().await.map_err(|e| OutdialError::ControlPlane {
                    message: format!("failed to decode {}: {e}", url.path()),
                    source: Some(Box::new(e)),
                })?;
                return Ok(Some(body));
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient(status) && attempt < self.max_retries {
                attempt += 1;
                warn!(attempt, status = %status, path = url.path(), "retrying control plane read");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
            return Err(OutdialError::ControlPlane {
                message: format!("GET {} returned {status}: {body}", url.path()),
                source: None,
            });
        }
    }

    fn parse_url(&self, path: &str) -> Result<Url, OutdialError> {
        Url::parse(&self.url(path)).map_err(|e| OutdialError::ControlPlane {
            message: format!("invalid control plane URL for {path}: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl ControlPlane for ControlPlaneClient {
    async fn issue_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, OutdialError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("client_secret", client_secret)
            .append_pair("grant_type", "client_credentials")
            .finish();

        let response = self
            .client
            .post(self.url("/connect/token"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| OutdialError::ControlPlane {
                message: format!("token request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutdialError::Credential(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        response.json::<TokenGrant>().await.map_err(|e| OutdialError::ControlPlane {
            message: format!("failed to decode token response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    async fn list_extensions(&self, token: &str) -> Result<Vec<Extension>, OutdialError> {
        let url = self.parse_url("/callcontrol")?;
        Ok(self.get_json(token, url).await?.unwrap_or_default())
    }

    async fn get_participant(
        &self,
        token: &str,
        entity: &str,
    ) -> Result<Option<Participant>, OutdialError> {
        let path = if entity.starts_with('/') {
            entity.to_string()
        } else {
            format!("/{entity}")
        };
        let url = self.parse_url(&path)?;
        self.get_json(token, url).await
    }

    async fn place_call(
        &self,
        token: &str,
        dn: &str,
        device_id: &str,
        destination: &str,
    ) -> Result<(), OutdialError> {
        let mut url = self.parse_url("/callcontrol")?;
        url.path_segments_mut()
            .map_err(|()| OutdialError::ControlPlane {
                message: "control plane base URL cannot carry a path".into(),
                source: None,
            })?
            .extend([dn, "devices", device_id, "makecall"]);

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&serde_json::json!({ "destination": destination }))
            .send()
            .await
            .map_err(|e| OutdialError::ControlPlane {
                message: format!("makecall request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(dn, "outbound call placed");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(OutdialError::ControlPlane {
            message: format!("makecall for {dn} returned {status}: {body}"),
            source: None,
        })
    }

    async fn agent_profile(&self, token: &str, dn: &str) -> Result<AgentProfile, OutdialError> {
        let url = Url::parse_with_params(
            &self.url("/xapi/v1/Users"),
            &[
                ("$filter", format!("Number eq '{dn}'")),
                ("$select", "CurrentProfileName".to_string()),
            ],
        )
        .map_err(|e| OutdialError::ControlPlane {
            message: format!("invalid user query URL: {e}"),
            source: Some(Box::new(e)),
        })?;

        let page: Option<UserPage> = self.get_json(token, url).await?;
        Ok(page
            .and_then(|p| p.value.into_iter().next())
            .unwrap_or_default())
    }
}
