// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for the command channel.
//!
//! Each client gets an outbound channel registered with the broadcaster. A
//! writer task drains it and pings the client every heartbeat; a client that
//! has not answered the previous ping is disconnected.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::commands::{ServerEvent, dispatch, parse_command};
use crate::server::GatewayState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let client_id = uuid::Uuid::new_v4().to_string();
    let mut rx: mpsc::Receiver<String> = state.broadcaster.register(&client_id);
    info!(client_id = %client_id, "dashboard client connected");

    match state.registry.list_all().await {
        Ok(snapshots) => {
            state
                .broadcaster
                .send_to(&client_id, ServerEvent::campaigns(&snapshots, None).to_json());
        }
        Err(e) => warn!(client_id = %client_id, error = %e, "failed to load campaigns for new client"),
    }

    let alive = Arc::new(AtomicBool::new(true));
    let heartbeat = state.heartbeat;
    let writer_alive = Arc::clone(&alive);
    let writer_id = client_id.clone();
    let mut writer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat);
        ticker.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !writer_alive.swap(false, Ordering::AcqRel) {
                        info!(client_id = %writer_id, "client missed heartbeat, disconnecting");
                        break;
                    }
                    if ws_sender.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            msg = ws_receiver.next() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        alive.store(true, Ordering::Release);
                        let reply = match parse_command(text.as_str()) {
                            Ok(command) => dispatch(&state.dialer, command).await,
                            Err(message) => {
                                debug!(client_id = %client_id, error = %message, "rejected client frame");
                                Some(ServerEvent::error(message))
                            }
                        };
                        if let Some(reply) = reply {
                            state.broadcaster.send_to(&client_id, reply.to_json());
                        }
                    }
                    Message::Pong(_) => alive.store(true, Ordering::Release),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    state.broadcaster.unregister(&client_id);
    writer.abort();
    info!(client_id = %client_id, "dashboard client disconnected");
}
