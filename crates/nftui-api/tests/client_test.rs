#![allow(clippy::unwrap_used)]
// Integration tests for `NftClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nftui_api::{AddForwardingRequest, BasicAuth, EditForwardingRequest, Error, NftClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NftClient) {
    let server = MockServer::start().await;
    let client = NftClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        None,
    )
    .unwrap();
    (server, client)
}

fn ok_ack(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "message": message }))
}

// ── Quota tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_quotas() {
    let (server, client) = setup().await;

    let body = json!({
        "quotas": [{
            "id": "inet_filter_output_12",
            "handle": 12,
            "port": 8388,
            "quota_bytes": 100_000_000_000_u64,
            "used_bytes": 95_000_000_000_u64,
            "usage_percent": 95.0,
            "status": "exceeded",
            "comment": "alice",
            "token": "ab12CD34"
        }],
        "allowed_ports": [{ "port": 8388, "handle": 4, "managed": true }],
        "read_only": false,
        "refresh_interval": 20
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/quotas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let resp = client.list_quotas().await.unwrap();

    assert_eq!(resp.quotas.len(), 1);
    assert_eq!(resp.quotas[0].id, "inet_filter_output_12");
    assert_eq!(resp.quotas[0].status, "exceeded");
    assert_eq!(resp.quotas[0].token.as_deref(), Some("ab12CD34"));
    assert_eq!(resp.allowed_ports[0].handle, 4);
    assert!(resp.allowed_ports[0].managed);
    assert_eq!(resp.refresh_interval, Some(20));
}

#[tokio::test]
async fn test_list_quotas_null_arrays_are_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/quotas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quotas": null,
            "allowed_ports": null,
            "read_only": true,
            "refresh_interval": 5
        })))
        .mount(&server)
        .await;

    let resp = client.list_quotas().await.unwrap();
    assert!(resp.quotas.is_empty());
    assert!(resp.allowed_ports.is_empty());
    assert_eq!(resp.refresh_interval, Some(5));
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/forwarding"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    match client.list_forwarding().await {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "not json"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_quotas_absent_arrays() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/quotas"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "read_only": true })),
        )
        .mount(&server)
        .await;

    let resp = client.list_quotas().await.unwrap();
    assert!(resp.quotas.is_empty());
    assert!(resp.allowed_ports.is_empty());
    assert!(resp.read_only);
    assert_eq!(resp.refresh_interval, None);
}

#[tokio::test]
async fn test_batch_reset_sends_ids() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/quotas/batch-reset"))
        .and(body_json(json!({ "ids": ["a", "b"] })))
        .respond_with(ok_ack("Reset 2 quotas"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .batch_reset_quotas(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_modify_and_add_quota_bodies() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/quotas/q1"))
        .and(body_json(json!({ "bytes": 5_000 })))
        .respond_with(ok_ack("Quota modified"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/quotas"))
        .and(body_json(json!({ "port": 9000, "bytes": 1_000, "comment": "bob" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.modify_quota("q1", 5_000).await.unwrap();
    client.add_quota(9000, 1_000, "bob").await.unwrap();
}

// ── Port tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_add_port_failure_surfaces_service_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ports"))
        .and(body_json(json!({ "port": 8080 })))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "success": false, "error": "port in use" })),
        )
        .mount(&server)
        .await;

    let err = client.add_port(8080).await.unwrap_err();

    assert_eq!(err.to_string(), "port in use");
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn test_delete_port_uses_handle() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/ports/17"))
        .respond_with(ok_ack("Port deleted"))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_port(17).await.unwrap();
}

// ── Forwarding tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_forwarding() {
    let (server, client) = setup().await;

    let body = json!({
        "rules": [
            {
                "id": "fwd-1", "src_port": 2222, "dst_ip": "10.0.0.5", "dst_port": 22,
                "protocol": "tcp", "comment": "ssh", "limit_mbps": 0, "enabled": true
            },
            {
                "id": "fwd-2", "src_port": 5353, "dst_ip": "10.0.0.6", "dst_port": 53,
                "protocol": "both", "enabled": false
            }
        ],
        "read_only": false
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/forwarding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let resp = client.list_forwarding().await.unwrap();

    assert_eq!(resp.rules.len(), 2);
    assert_eq!(resp.rules[0].dst_ip, "10.0.0.5");
    assert!(!resp.rules[1].enabled);
    assert_eq!(resp.rules[1].comment, "");
}

#[tokio::test]
async fn test_add_and_edit_forwarding_bodies() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/forwarding"))
        .and(body_json(json!({
            "src_port": 2222, "dst_ip": "10.0.0.5", "dst_port": 22,
            "protocol": "tcp", "comment": "ssh", "limit_mbps": 10
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/forwarding/fwd-1"))
        .and(body_json(json!({
            "dst_ip": "10.0.0.9", "dst_port": 2022,
            "protocol": "udp", "comment": "", "limit_mbps": 0
        })))
        .respond_with(ok_ack("Forwarding rule updated successfully"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .add_forwarding(&AddForwardingRequest {
            src_port: 2222,
            dst_ip: "10.0.0.5".into(),
            dst_port: 22,
            protocol: "tcp".into(),
            comment: "ssh".into(),
            limit_mbps: 10,
        })
        .await
        .unwrap();

    client
        .edit_forwarding(
            "fwd-1",
            &EditForwardingRequest {
                dst_ip: "10.0.0.9".into(),
                dst_port: 2022,
                protocol: "udp".into(),
                comment: String::new(),
                limit_mbps: 0,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_enable_disable_forwarding_paths() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/forwarding/r1/enable"))
        .respond_with(ok_ack("Forwarding rule enabled successfully"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/forwarding/r1/disable"))
        .respond_with(ok_ack("Forwarding rule disabled successfully"))
        .expect(1)
        .mount(&server)
        .await;

    client.enable_forwarding("r1").await.unwrap();
    client.disable_forwarding("r1").await.unwrap();
}

// ── Error and auth tests ────────────────────────────────────────────

#[tokio::test]
async fn test_read_only_rejection() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "success": false, "error": "Server is in read-only mode" })),
        )
        .mount(&server)
        .await;

    let err = client.delete_forwarding("r1").await.unwrap_err();

    assert!(err.is_read_only());
    assert_eq!(err.to_string(), "Server is in read-only mode");
}

#[tokio::test]
async fn test_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_forwarding().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_status_classification() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/quotas/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/quotas/busy"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "success": false, "error": "nft busy" })),
        )
        .mount(&server)
        .await;

    let missing = client.delete_quota("gone").await.unwrap_err();
    assert!(missing.is_not_found());
    assert!(!missing.is_transient());
    assert_eq!(missing.to_string(), "HTTP 404");

    let busy = client.delete_quota("busy").await.unwrap_err();
    assert!(busy.is_transient());
    assert_eq!(busy.status(), Some(503));
    assert_eq!(busy.to_string(), "nft busy");
}

#[tokio::test]
async fn test_basic_auth_header_is_sent() {
    let server = MockServer::start().await;
    let client = NftClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        Some(BasicAuth {
            username: "admin".into(),
            password: "s3cret".to_string().into(),
        }),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/quotas/q1/reset"))
        .and(header("authorization", "Basic YWRtaW46czNjcmV0"))
        .respond_with(ok_ack("Quota reset"))
        .expect(1)
        .mount(&server)
        .await;

    client.reset_quota("q1").await.unwrap();
}
