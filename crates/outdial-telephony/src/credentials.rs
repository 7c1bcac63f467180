// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access credential lifecycle for one campaign.
//!
//! The current token is published through an [`ArcSwapOption`] so readers never
//! wait; refreshes are serialized by a mutex so concurrent callers issue at
//! most one token request.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use outdial_core::{ControlPlane, OutdialError};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Upper bound applied to reported token lifetimes (one year).
const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 3600;

/// A token with its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Remaining validity at `now`, zero once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Owns a campaign's client credentials and its current access token.
pub struct CredentialManager {
    control_plane: Arc<dyn ControlPlane>,
    client_id: String,
    client_secret: SecretString,
    refresh_margin: Duration,
    current: ArcSwapOption<IssuedToken>,
    refresh_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        client_id: String,
        client_secret: SecretString,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            control_plane,
            client_id,
            client_secret,
            refresh_margin,
            current: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The current token, if one has been issued.
    pub fn access_token(&self) -> Option<String> {
        self.current.load_full().map(|t| t.token.clone())
    }

    /// Remaining validity of the current token; `None` before the first issue.
    pub fn remaining_validity(&self) -> Option<Duration> {
        self.current
            .load_full()
            .map(|t| t.remaining_at(Utc::now()))
    }

    /// Refresh only when missing or within the refresh margin of expiry.
    ///
    /// Returns `true` when the token value changed.
    pub async fn check_and_refresh(&self) -> Result<bool, OutdialError> {
        let _guard = self.refresh_lock.lock().await;

        let needs_refresh = match self.current.load_full() {
            None => true,
            Some(token) => token.remaining_at(Utc::now()) <= self.refresh_margin,
        };
        if !needs_refresh {
            return Ok(false);
        }

        let previous = self.access_token();
        let issued = self.issue().await?;
        let changed = previous.as_deref() != Some(issued.as_str());
        debug!(client_id = %self.client_id, changed, "access token checked and refreshed");
        Ok(changed)
    }

    /// Issue a new token unconditionally and return it.
    pub async fn force_refresh(&self) -> Result<String, OutdialError> {
        let _guard = self.refresh_lock.lock().await;
        self.issue().await
    }

    async fn issue(&self) -> Result<String, OutdialError> {
        let grant = self
            .control_plane
            .issue_token(&self.client_id, self.client_secret.expose_secret())
            .await?;

        if grant.access_token.is_empty() {
            return Err(OutdialError::Credential(
                "token endpoint returned an empty access token".into(),
            ));
        }

        let issued_at = Utc::now();
        let lifetime = chrono::Duration::seconds(grant.expires_in.min(MAX_TOKEN_LIFETIME_SECS) as i64);
        let token = IssuedToken {
            token: grant.access_token,
            issued_at,
            expires_at: issued_at + lifetime,
        };
        info!(
            client_id = %self.client_id,
            expires_in_secs = grant.expires_in,
            "access token issued"
        );
        let value = token.token.clone();
        self.current.store(Some(Arc::new(token)));
        Ok(value)
    }
}
