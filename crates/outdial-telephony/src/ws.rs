// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent event WebSocket to the telephony control plane.
//!
//! One [`WsLink`] per campaign. A background driver task owns the socket:
//! it pings on a fixed interval and tears the socket down when a pong does
//! not arrive before the next ping, then reconnects with a fixed delay up to
//! a bounded number of attempts. Decoded frames go to the registered
//! [`FrameHandler`]; malformed frames are logged and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use outdial_config::model::TelephonyConfig;
use outdial_core::{FrameHandler, OutdialError, ProtocolConnector, ProtocolLink};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::frame;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters for the event WebSocket.
#[derive(Debug, Clone)]
pub struct WsSettings {
    pub url: String,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl WsSettings {
    pub fn from_config(config: &TelephonyConfig) -> Self {
        Self {
            url: config.ws_url(),
            heartbeat_interval: config.heartbeat_interval(),
            reconnect_delay: config.reconnect_delay(),
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}

/// Why a socket session ended.
enum SessionEnd {
    Cancelled,
    Lost(String),
}

/// Opens [`WsLink`]s.
#[derive(Debug, Clone)]
pub struct WsConnector {
    settings: WsSettings,
}

impl WsConnector {
    pub fn new(settings: WsSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ProtocolConnector for WsConnector {
    async fn connect(
        &self,
        token: &str,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Box<dyn ProtocolLink>, OutdialError> {
        let socket = open_socket(&self.settings.url, token).await?;
        info!(url = %self.settings.url, "event websocket connected");

        let cancel = CancellationToken::new();
        let connected = Arc::new(AtomicBool::new(true));
        tokio::spawn(drive(
            self.settings.clone(),
            token.to_string(),
            socket,
            handler,
            cancel.clone(),
            connected.clone(),
        ));

        Ok(Box::new(WsLink { cancel, connected }))
    }
}

/// Handle to a running event WebSocket.
pub struct WsLink {
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl ProtocolLink for WsLink {
    async fn disconnect(&self) {
        if !self.cancel.is_cancelled() {
            debug!("event websocket disconnect requested");
        }
        self.cancel.cancel();
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn open_socket(url: &str, token: &str) -> Result<Socket, OutdialError> {
    let mut request = url.into_client_request().map_err(|e| OutdialError::Protocol {
        message: format!("invalid websocket URL {url}: {e}"),
        source: Some(Box::new(e)),
    })?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
        OutdialError::Credential(format!("access token is not a valid header value: {e}"))
    })?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let (socket, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| OutdialError::Protocol {
            message: format!("websocket handshake with {url} failed: {e}"),
            source: Some(Box::new(e)),
        })?;
    Ok(socket)
}

/// Own the socket for the lifetime of the link, reconnecting as needed.
async fn drive(
    settings: WsSettings,
    token: String,
    first: Socket,
    handler: Arc<dyn FrameHandler>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
) {
    let mut socket = first;
    let mut reconnected = false;

    loop {
        handler.on_open(reconnected).await;

        let reason = match pump(socket, &handler, settings.heartbeat_interval, &cancel).await {
            SessionEnd::Cancelled => break,
            SessionEnd::Lost(reason) => reason,
        };
        connected.store(false, Ordering::SeqCst);
        warn!(reason = %reason, "event websocket lost");

        match reconnect(&settings, &token, &cancel).await {
            Some(next) => {
                socket = next;
                connected.store(true, Ordering::SeqCst);
                reconnected = true;
            }
            None if cancel.is_cancelled() => break,
            None => {
                handler
                    .on_failure(format!(
                        "event websocket could not reconnect after {} attempts: {reason}",
                        settings.max_reconnect_attempts
                    ))
                    .await;
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    debug!("event websocket driver stopped");
}

/// Fixed-delay reconnect. `None` when cancelled or attempts are exhausted.
async fn reconnect(settings: &WsSettings, token: &str, cancel: &CancellationToken) -> Option<Socket> {
    for attempt in 1..=settings.max_reconnect_attempts {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(settings.reconnect_delay) => {}
        }
        match open_socket(&settings.url, token).await {
            Ok(socket) => {
                info!(attempt, "event websocket reconnected");
                return Some(socket);
            }
            Err(e) => warn!(attempt, error = %e, "event websocket reconnect failed"),
        }
    }
    None
}

/// Read frames and keep the heartbeat until the session ends.
async fn pump(
    socket: Socket,
    handler: &Arc<dyn FrameHandler>,
    heartbeat: Duration,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (mut sink, mut source) = socket.split();
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.tick().await;
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return SessionEnd::Cancelled;
            }
            _ = ticker.tick() => {
                if awaiting_pong {
                    return SessionEnd::Lost("heartbeat timed out".into());
                }
                awaiting_pong = true;
                if let Err(e) = sink.send(Message::Ping(Vec::new().into())).await {
                    return SessionEnd::Lost(format!("heartbeat send failed: {e}"));
                }
            }
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => match frame::parse_frame(text.as_str()) {
                    Ok(event) => handler.on_event(event).await,
                    Err(e) => warn!(error = %e, "discarding malformed frame"),
                },
                Some(Ok(Message::Pong(_))) => awaiting_pong = false,
                Some(Ok(Message::Close(_))) | None => {
                    return SessionEnd::Lost("closed by server".into());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
            },
        }
    }
}
