// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event WebSocket tests against a local axum server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use outdial_core::types::ProtocolEvent;
use outdial_core::{FrameHandler, ProtocolConnector};
use outdial_telephony::{WsConnector, WsSettings};
use tokio::sync::Mutex;

#[derive(Default)]
struct Recorder {
    opens: Mutex<Vec<bool>>,
    events: Mutex<Vec<ProtocolEvent>>,
    failures: Mutex<Vec<String>>,
}

#[async_trait]
impl FrameHandler for Recorder {
    async fn on_open(&self, reconnected: bool) {
        self.opens.lock().await.push(reconnected);
    }

    async fn on_event(&self, event: ProtocolEvent) {
        self.events.lock().await.push(event);
    }

    async fn on_failure(&self, message: String) {
        self.failures.lock().await.push(message);
    }
}

#[derive(Clone, Default)]
struct ServerState {
    upgrades: Arc<AtomicUsize>,
}

/// First upgrade: sends two valid frames and one malformed one, then closes.
/// Later upgrades are rejected with 401 so reconnects fail.
async fn ws_route(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<ServerState>,
) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer tok-1");
    if !authorized || state.upgrades.fetch_add(1, Ordering::SeqCst) > 0 {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(serve_frames)
}

async fn serve_frames(mut socket: WebSocket) {
    let frames = [
        r#"{"sequence": 1, "event": {"event_type": 0, "entity": "/callcontrol/101/participants/1"}}"#,
        "garbage",
        r#"{"sequence": 2, "event": {"event_type": 1, "entity": "/callcontrol/101/participants/1"}}"#,
    ];
    for frame in frames {
        if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
            return;
        }
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    let _ = socket.send(Message::Close(None)).await;
}

async fn start_server() -> (String, ServerState) {
    let state = ServerState::default();
    let app = Router::new()
        .route("/callcontrol/ws", get(ws_route))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{addr}/callcontrol/ws"), state)
}

fn settings(url: String) -> WsSettings {
    WsSettings {
        url,
        heartbeat_interval: Duration::from_secs(30),
        reconnect_delay: Duration::from_millis(20),
        max_reconnect_attempts: 2,
    }
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn delivers_frames_and_reports_exhausted_reconnects() {
    let (url, state) = start_server().await;
    let recorder = Arc::new(Recorder::default());
    let connector = WsConnector::new(settings(url));

    let link = connector.connect("tok-1", recorder.clone()).await.unwrap();
    assert!(link.is_connected());

    let r = recorder.clone();
    wait_until(|| {
        let r = r.clone();
        async move { !r.failures.lock().await.is_empty() }
    })
    .await;

    let events = recorder.events.lock().await;
    assert_eq!(events.len(), 2, "malformed frame must be dropped");
    assert_eq!(events[0].sequence, Some(1));
    assert_eq!(events[1].extension_dn(), Some("101"));
    assert_eq!(*recorder.opens.lock().await, vec![false]);
    assert!(!link.is_connected());
    // One accepted upgrade plus two rejected reconnects.
    assert_eq!(state.upgrades.load(Ordering::SeqCst), 3);

    link.disconnect().await;
    link.disconnect().await;
}

#[tokio::test]
async fn rejected_handshake_is_protocol_error() {
    let (url, _state) = start_server().await;
    let connector = WsConnector::new(settings(url));
    let result = connector
        .connect("wrong-token", Arc::new(Recorder::default()))
        .await;
    assert!(matches!(
        result,
        Err(outdial_core::OutdialError::Protocol { .. })
    ));
}
