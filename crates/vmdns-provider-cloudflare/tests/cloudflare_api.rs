//! Cloudflare API v4 wire tests against a local mock server

use serde_json::json;
use vmdns_core::Error;
use vmdns_core::model::DnsZone;
use vmdns_core::traits::{DnsProvider, RecordPayload};
use vmdns_provider_cloudflare::CloudflareProvider;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn zone() -> DnsZone {
    DnsZone {
        id: "zone123".to_string(),
        name: "example.com".to_string(),
    }
}

fn payload(content: &str) -> RecordPayload {
    RecordPayload {
        record_type: "A",
        name: "web1".to_string(),
        content: content.to_string(),
        ttl: 120,
        proxied: false,
    }
}

fn record_json(id: &str, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "A",
        "name": "web1.example.com",
        "content": content,
        "ttl": 120,
        "proxied": false
    })
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result
    }))
}

fn provider(server: &MockServer) -> CloudflareProvider {
    CloudflareProvider::new("test-token", None)
        .unwrap()
        .with_base_url(server.uri())
}

#[tokio::test]
async fn find_zone_by_name_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ok(json!([{"id": "zone123", "name": "example.com"}])))
        .expect(1)
        .mount(&server)
        .await;

    let zone = provider(&server).find_zone("example.com").await.unwrap();

    assert_eq!(zone, Some(self::zone()));
}

#[tokio::test]
async fn find_zone_empty_result_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let zone = provider(&server).find_zone("example.org").await.unwrap();

    assert_eq!(zone, None);
}

#[tokio::test]
async fn global_key_uses_email_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(header("x-auth-email", "ops@example.com"))
        .and(header("x-auth-key", "global-key"))
        .respond_with(ok(json!([{"id": "zone123", "name": "example.com"}])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CloudflareProvider::new("global-key", Some("ops@example.com".to_string()))
        .unwrap()
        .with_base_url(server.uri());
    let zone = provider.find_zone("example.com").await.unwrap();

    assert!(zone.is_some());
}

#[tokio::test]
async fn list_filters_by_type_and_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/zone123/dns_records"))
        .and(query_param("type", "A"))
        .and(query_param("name", "web1.example.com"))
        .respond_with(ok(json!([record_json("rec123", "10.0.0.2")])))
        .expect(1)
        .mount(&server)
        .await;

    let records = provider(&server)
        .list_a_records(&zone(), "web1.example.com")
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "rec123");
    assert_eq!(records[0].content, "10.0.0.2");
    assert_eq!(records[0].ttl, Some(120));
}

#[tokio::test]
async fn create_posts_full_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone123/dns_records"))
        .and(body_json(json!({
            "type": "A",
            "name": "web1",
            "content": "10.0.0.9",
            "ttl": 120,
            "proxied": false
        })))
        .respond_with(ok(record_json("rec999", "10.0.0.9")))
        .expect(1)
        .mount(&server)
        .await;

    let record = provider(&server)
        .create_a_record(&zone(), &payload("10.0.0.9"))
        .await
        .unwrap();

    assert_eq!(record.id, "rec999");
}

#[tokio::test]
async fn update_puts_to_record_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/zones/zone123/dns_records/rec123"))
        .and(body_json(json!({
            "type": "A",
            "name": "web1",
            "content": "10.0.0.9",
            "ttl": 120,
            "proxied": false
        })))
        .respond_with(ok(record_json("rec123", "10.0.0.9")))
        .expect(1)
        .mount(&server)
        .await;

    let record = provider(&server)
        .update_a_record(&zone(), "rec123", &payload("10.0.0.9"))
        .await
        .unwrap();

    assert_eq!(record.content, "10.0.0.9");
}

#[tokio::test]
async fn each_call_is_single_shot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone123/dns_records"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .create_a_record(&zone(), &payload("10.0.0.9"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { transient: true, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn status_codes_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "denied.com"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "errors": [{"code": 9109, "message": "Invalid access token"}],
            "result": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "busy.com"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/zones/zone123/dns_records/rec123"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "errors": [{"code": 9005, "message": "Content for A record is invalid"}],
            "result": null
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);

    let err = provider.find_zone("denied.com").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(ref m) if m.contains("Invalid access token")));
    assert!(!err.is_retryable());

    let err = provider.find_zone("busy.com").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited(_)));
    assert!(err.is_retryable());

    let err = provider
        .update_a_record(&zone(), "rec123", &payload("bogus"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { transient: false, .. }));
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/zone123/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{"code": 1000, "message": "something odd"}],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .list_a_records(&zone(), "web1.example.com")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("something odd"));
}

#[tokio::test]
async fn unreachable_api_is_retryable_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let provider = CloudflareProvider::new("test-token", None)
        .unwrap()
        .with_base_url(uri);
    let err = provider.find_zone("example.com").await.unwrap_err();

    assert!(matches!(err, Error::Http(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn garbled_body_after_create_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone123/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .create_a_record(&zone(), &payload("10.0.0.9"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { transient: false, .. }));
    assert!(!err.is_retryable());
}
