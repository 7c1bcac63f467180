// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `outdial serve` command implementation.
//!
//! Opens the SQLite store, builds the telephony, record-service and relay
//! clients, recovers campaigns left over from the previous run, and serves
//! the command gateway until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use outdial_campaign::{CampaignDeps, CampaignSettings, Dialer};
use outdial_config::OutdialConfig;
use outdial_config::validation::validate_endpoints;
use outdial_core::{CampaignRegistry, OutdialError};
use outdial_gateway::{GatewayState, ServerConfig, WsBroadcaster, start_server};
use outdial_records::{RecordClient, RelayClient};
use outdial_storage::{Database, SqliteCallQueue, SqliteRegistry};
use outdial_telephony::{ControlPlaneClient, WsConnector, WsSettings};
use tracing::{error, info, warn};

use crate::shutdown;

/// Everything `serve` wires together.
pub struct Services {
    pub dialer: Arc<Dialer>,
    pub broadcaster: WsBroadcaster,
    pub registry: Arc<dyn CampaignRegistry>,
    pub db: Database,
}

/// Build the collaborator clients and the dialer from configuration.
pub async fn build_services(config: &OutdialConfig) -> Result<Services, OutdialError> {
    if let Err(errors) = validate_endpoints(config) {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(OutdialError::Config(message));
    }

    let db = outdial_storage::open_from_config(&config.storage).await?;
    let registry: Arc<dyn CampaignRegistry> = Arc::new(SqliteRegistry::new(db.clone()));
    let broadcaster = WsBroadcaster::new();

    let deps = CampaignDeps {
        control_plane: Arc::new(ControlPlaneClient::from_config(&config.telephony)?),
        records: Arc::new(RecordClient::from_config(&config.records)?),
        relay: Arc::new(RelayClient::from_config(&config.relay)?),
        registry: Arc::clone(&registry),
        broadcast: Arc::new(broadcaster.clone()),
        queue: Arc::new(SqliteCallQueue::new(db.clone())),
        connector: Arc::new(WsConnector::new(WsSettings::from_config(&config.telephony))),
    };
    let dialer = Arc::new(Dialer::new(deps, CampaignSettings::from_config(config)));

    Ok(Services {
        dialer,
        broadcaster,
        registry,
        db,
    })
}

/// Runs the `outdial serve` command.
pub async fn run_serve(config: OutdialConfig) -> Result<(), OutdialError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting outdial serve");

    let services = build_services(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let report = services
        .dialer
        .recover(config.dialer.auto_recover_on_restart)
        .await?;
    if !report.failed.is_empty() {
        warn!(failed = ?report.failed, "some campaigns could not be recovered");
    }

    let gateway = if config.gateway.enabled {
        let server_config = ServerConfig {
            bind_address: config.gateway.bind_address.clone(),
            port: config.gateway.port,
        };
        let state = GatewayState {
            dialer: Arc::clone(&services.dialer),
            broadcaster: services.broadcaster.clone(),
            registry: Arc::clone(&services.registry),
            heartbeat: Duration::from_secs(config.gateway.client_heartbeat_secs.max(1)),
        };
        let gateway_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = start_server(&server_config, state, gateway_cancel.clone()).await {
                error!(error = %e, "gateway failed");
                gateway_cancel.cancel();
            }
        }))
    } else {
        info!("gateway disabled");
        None
    };

    cancel.cancelled().await;
    info!("shutting down");

    services.dialer.shutdown().await;
    if let Some(gateway) = gateway {
        if let Err(e) = gateway.await {
            warn!(error = %e, "gateway task ended abnormally");
        }
    }
    services.db.close().await?;

    info!("outdial serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("outdial={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
