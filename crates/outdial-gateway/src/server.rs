// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use outdial_campaign::Dialer;
use outdial_core::{CampaignRegistry, OutdialError};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::broadcast::WsBroadcaster;
use crate::ws;

const BANNER: &str = concat!("outdial campaign dialer ", env!("CARGO_PKG_VERSION"));

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dialer: Arc<Dialer>,
    pub broadcaster: WsBroadcaster,
    /// Source of the snapshot list sent to newly connected clients.
    pub registry: Arc<dyn CampaignRegistry>,
    /// Interval between server pings; a client that misses one is dropped.
    pub heartbeat: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Routes: `GET /` banner and `GET /ws` command channel.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn banner() -> &'static str {
    BANNER
}

/// Bind and serve until `shutdown` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), OutdialError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| OutdialError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(addr = %addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| OutdialError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_service() {
        assert!(BANNER.starts_with("outdial campaign dialer"));
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 4020,
        };
        assert!(format!("{config:?}").contains("4020"));
    }
}
