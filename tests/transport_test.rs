//! Wiremock integration tests for the reqwest-backed transport.
//!
//! These tests verify correct HTTP interaction — auth, headers, conditional
//! requests — end to end through the gated clients and the avatar cache.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heimdall::cache::{AvatarTransport, ConditionalHeaders};
use heimdall::client::{GraphQlRequest, RestRequest};
use heimdall::providers::{HttpTransport, HttpTransportConfig};
use heimdall::{Bulkhead, GatedGraphQlClient, GatedRestClient, HeimdallError, RateLimitTracker};

fn transport_for(server: &MockServer) -> Arc<HttpTransport> {
    Arc::new(
        HttpTransport::new(HttpTransportConfig::new(server.uri()).token("test_key"))
            .expect("client builds"),
    )
}

fn gated_rest(transport: Arc<HttpTransport>) -> (GatedRestClient, Arc<RateLimitTracker>) {
    let gate = Arc::new(Bulkhead::new(heimdall::notify::null_notifier()));
    let tracker = Arc::new(RateLimitTracker::new());
    (
        GatedRestClient::new(transport, gate, Arc::clone(&tracker)),
        tracker,
    )
}

#[tokio::test]
async fn rest_call_carries_auth_and_reads_rate_limit_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/o/r/pulls"))
        .and(header("Authorization", "Bearer test_key"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "number": 1 }]))
                .insert_header("x-ratelimit-limit", "5000")
                .insert_header("x-ratelimit-remaining", "900"),
        )
        .mount(&mock_server)
        .await;

    let (client, tracker) = gated_rest(transport_for(&mock_server));
    let response = client
        .call::<Vec<serde_json::Value>>(RestRequest::get("/repos/o/r/pulls"))
        .await
        .expect("call should succeed");

    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0]["number"], 1);
    assert!(
        tracker.has_signaled_low_remaining(),
        "remaining=900 must trip the low-budget signal"
    );
}

#[tokio::test]
async fn rest_error_statuses_become_api_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
        )
        .mount(&mock_server)
        .await;

    let (client, _) = gated_rest(transport_for(&mock_server));
    let err = client
        .call::<serde_json::Value>(RestRequest::get("/repos/o/r"))
        .await
        .unwrap_err();

    match err {
        HeimdallError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn graphql_post_carries_operation_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("Authorization", "Bearer test_key"))
        .and(body_partial_json(json!({ "operationName": "GetViewer" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "viewer": { "login": "octocat" },
                "rateLimit": { "limit": 5000, "cost": 1, "remaining": 4999 }
            }
        })))
        .mount(&mock_server)
        .await;

    let gate = Arc::new(Bulkhead::new(heimdall::notify::null_notifier()));
    let tracker = Arc::new(RateLimitTracker::new());
    let client = GatedGraphQlClient::new(transport_for(&mock_server), gate, tracker);

    let response = client
        .query(
            GraphQlRequest::new("query GetViewer { viewer { login } }")
                .operation_name("GetViewer"),
        )
        .await
        .expect("query should succeed");

    assert_eq!(response.data["viewer"]["login"], "octocat");
    assert!(response.errors.is_empty());
    assert_eq!(response.rate_limit().unwrap().remaining, 4999);
}

#[tokio::test]
async fn avatar_fetch_passes_conditional_headers_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/u/42"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(
            ResponseTemplate::new(304).insert_header("etag", "\"v1\""),
        )
        .mount(&mock_server)
        .await;

    let transport = transport_for(&mock_server);
    let conditional = ConditionalHeaders {
        if_none_match: Some("\"v1\"".to_owned()),
        if_modified_since: None,
    };
    let response = transport
        .fetch(&format!("{}/u/42", mock_server.uri()), &conditional)
        .await
        .expect("304 is a response, not an error");

    assert!(response.is_not_modified());
    assert_eq!(response.header("etag"), Some("\"v1\""));
}

#[tokio::test]
async fn avatar_fetch_returns_body_and_headers_on_200() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/u/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"png-bytes".to_vec())
                .insert_header("content-type", "image/png")
                .insert_header("cache-control", "max-age=3600"),
        )
        .mount(&mock_server)
        .await;

    let transport = transport_for(&mock_server);
    let response = transport
        .fetch(
            &format!("{}/u/42", mock_server.uri()),
            &ConditionalHeaders::none(),
        )
        .await
        .expect("fetch should succeed");

    assert!(response.is_success());
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(&response.body[..], b"png-bytes");
}

#[tokio::test]
async fn network_failure_maps_to_http_error() {
    // A server that is immediately shut down: connections are refused.
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    drop(mock_server);

    let transport = Arc::new(
        HttpTransport::new(HttpTransportConfig::new(uri.as_str())).expect("client builds"),
    );
    let (client, tracker) = gated_rest(transport);

    let err = client
        .call::<serde_json::Value>(RestRequest::get("/repos/o/r"))
        .await
        .unwrap_err();

    assert!(matches!(err, HeimdallError::Http(_)));
    // No response, no accounting.
    assert!(!tracker.has_signaled_low_remaining());
}
