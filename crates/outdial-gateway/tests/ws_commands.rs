// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command channel round trips against a live gateway on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use outdial_campaign::{CampaignDeps, CampaignSettings, Dialer};
use outdial_gateway::{GatewayState, WsBroadcaster, router};
use outdial_test_utils::{
    MemoryQueue, MemoryRegistry, MockConnector, MockControlPlane, MockRecordService, MockRelay,
    PrimaryBehavior, idle_extension,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_gateway() -> std::net::SocketAddr {
    let broadcaster = WsBroadcaster::new();
    let registry = Arc::new(MemoryRegistry::new());
    let deps = CampaignDeps {
        control_plane: MockControlPlane::new(vec![idle_extension("101")]).shared(),
        records: Arc::new(MockRecordService::new()),
        relay: Arc::new(MockRelay::new(PrimaryBehavior::Accept)),
        registry: registry.clone(),
        broadcast: Arc::new(broadcaster.clone()),
        queue: Arc::new(MemoryQueue::new()),
        connector: Arc::new(MockConnector::new()),
    };
    let state = GatewayState {
        dialer: Arc::new(Dialer::new(deps, CampaignSettings::immediate())),
        broadcaster,
        registry,
        heartbeat: Duration::from_secs(30),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: std::net::SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn send(client: &mut Client, json: &str) {
    client.send(Message::Text(json.to_string().into())).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
async fn next_event(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn new_client_receives_campaign_list() {
    let addr = spawn_gateway().await;
    let mut client = connect(addr).await;

    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "campaigns");
    assert_eq!(event["data"], Value::Array(vec![]));
}

#[tokio::test]
async fn ping_gets_pong() {
    let addr = spawn_gateway().await;
    let mut client = connect(addr).await;
    next_event(&mut client).await;

    send(&mut client, r#"{"command":"ping"}"#).await;
    assert_eq!(next_event(&mut client).await["event"], "pong");
}

#[tokio::test]
async fn malformed_command_gets_error() {
    let addr = spawn_gateway().await;
    let mut client = connect(addr).await;
    next_event(&mut client).await;

    send(&mut client, "not json").await;
    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "error");
    assert!(event["message"].as_str().unwrap().starts_with("invalid command"));
}

#[tokio::test]
async fn start_command_broadcasts_redacted_campaign() {
    let addr = spawn_gateway().await;
    let mut client = connect(addr).await;
    let mut observer = connect(addr).await;
    next_event(&mut client).await;
    next_event(&mut observer).await;

    send(
        &mut client,
        r#"{"command":"start","campaign":{"campaign_id":"p1","call_flow_id":"f1","client_id":"id","client_secret":"hunter2"}}"#,
    )
    .await;

    for c in [&mut client, &mut observer] {
        let event = next_event(c).await;
        assert_eq!(event["event"], "campaigns");
        assert_eq!(event["changed"], "p1");
        let campaign = &event["data"][0];
        assert_eq!(campaign["campaign_id"], "p1");
        assert_eq!(campaign["state"], "active");
        assert_eq!(campaign["client_secret"], "");
        assert!(campaign.get("access_token").is_none());
    }
}

#[tokio::test]
async fn invalid_start_reports_error() {
    let addr = spawn_gateway().await;
    let mut client = connect(addr).await;
    next_event(&mut client).await;

    send(
        &mut client,
        r#"{"command":"start","campaign":{"campaign_id":"p1","call_flow_id":"f1","client_id":"id","client_secret":""}}"#,
    )
    .await;

    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "error");
    assert!(event["message"].as_str().unwrap().contains("client_secret"));
}

#[tokio::test]
async fn stopping_unknown_campaign_reports_error() {
    let addr = spawn_gateway().await;
    let mut client = connect(addr).await;
    next_event(&mut client).await;

    send(&mut client, r#"{"command":"stop","campaign_id":"missing"}"#).await;

    // The registry broadcast for the removal arrives before the reply.
    let mut event = next_event(&mut client).await;
    if event["event"] == "campaigns" {
        event = next_event(&mut client).await;
    }
    assert_eq!(event["event"], "error");
    assert!(event["message"].as_str().unwrap().contains("not running"));
}

#[tokio::test]
async fn root_serves_banner() {
    let addr = spawn_gateway().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("outdial campaign dialer"));
}
