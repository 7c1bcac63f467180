// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record service and relay clients against wiremock servers.

use std::time::Duration;

use chrono::Utc;
use outdial_core::types::{CandidateStatus, OutcomeCode, VisitRecord};
use outdial_core::{NotificationRelay, OutdialError, RecordService};
use outdial_records::{RecordClient, RelayClient};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn records(server: &MockServer) -> RecordClient {
    RecordClient::new(&server.uri(), None, timeout()).unwrap()
}

#[tokio::test]
async fn fetch_candidates_sends_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/p1/customers"))
        .and(query_param("callFlowId", "f1"))
        .and(query_param("callStatus", "2"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [
                {"customerId": "c1", "customer": {"memberName": "Ann", "phone": "0911"}},
                {"customerId": "c2"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidates = records(&server)
        .fetch_candidates("f1", "p1", CandidateStatus::Failed, 10)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].phone.as_deref(), Some("0911"));
    assert_eq!(candidates[0].member_name.as_deref(), Some("Ann"));
    assert!(candidates[1].phone.is_none());
}

#[tokio::test]
async fn api_key_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/projects/p1/customers/c1/call-status"))
        .and(header("authorization", "Bearer rk-9"))
        .and(body_json(serde_json::json!({"callStatus": 2})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = RecordClient::new(
        &server.uri(),
        Some(secrecy::SecretString::from("rk-9".to_string())),
        timeout(),
    )
    .unwrap();
    client
        .report_call_status("p1", "c1", OutcomeCode::Failed)
        .await
        .unwrap();
}

#[tokio::test]
async fn write_endpoints_hit_expected_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/p1/customers/c1/dial-attempts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/projects/p1/customers/c1/visits"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/projects/p1/auto-dial"))
        .and(body_json(serde_json::json!({"callFlowId": "f1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = records(&server);
    client.increment_dial_attempt("p1", "c1").await.unwrap();
    client
        .write_visit_record(&VisitRecord {
            campaign_id: "p1".into(),
            customer_id: "c1".into(),
            visit_type: "intro".into(),
            visited_by: "admin".into(),
            visited_at: Utc::now(),
            title: "call connected".into(),
            detail: "call connected".into(),
        })
        .await
        .unwrap();
    client.advance_auto_dial_marker("p1", "f1").await.unwrap();
}

#[tokio::test]
async fn server_error_is_record_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = records(&server)
        .increment_dial_attempt("p1", "c1")
        .await
        .unwrap_err();
    match err {
        OutdialError::RecordService { message, .. } => assert!(message.contains("500")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn primary_relay_returns_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/relay"))
        .and(body_json(serde_json::json!({
            "description": "d1", "description2": "d2", "phone": "0911"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"StatusCode": 0, "Message": "Success"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let relay = RelayClient::new(&format!("{}/relay", server.uri()), "", timeout()).unwrap();
    assert!(relay.is_enabled());
    let receipt = relay.relay_primary("d1", "d2", "0911").await.unwrap();
    assert!(receipt.is_business_success());
    // Disabled secondary is a no-op.
    relay.relay_secondary("d1", "d2", "0911").await.unwrap();
}

#[tokio::test]
async fn relay_transport_failure_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let relay = RelayClient::new(
        &format!("{}/relay", server.uri()),
        &format!("{}/dummy", server.uri()),
        timeout(),
    )
    .unwrap();
    assert!(matches!(
        relay.relay_primary("d1", "d2", "0911").await,
        Err(OutdialError::Relay { .. })
    ));
    assert!(relay.relay_secondary("d1", "d2", "0911").await.is_err());
}

#[tokio::test]
async fn empty_primary_disables_relay() {
    let relay = RelayClient::new("", "", Duration::from_secs(1)).unwrap();
    assert!(!relay.is_enabled());
    assert!(relay.relay_primary("d1", "d2", "0911").await.is_err());
}
