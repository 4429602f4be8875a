//! Integration tests for `StorageClient::upload`.
//!
//! Uses `wiremock` to stand up a local upload endpoint per test so no real
//! network traffic is made.

use std::collections::BTreeMap;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pulsevest_storage::{ResourceType, StorageClient, StorageError};

fn test_client(server: &MockServer) -> StorageClient {
    StorageClient::new(&server.uri(), "demo", "test-key", "test-secret", 5)
        .expect("failed to build test StorageClient")
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_returns_secure_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/video/upload"))
        .and(body_string_contains("name=\"api_key\""))
        .and(body_string_contains("test-key"))
        .and(body_string_contains("name=\"signature\""))
        .and(body_string_contains("filename=\"clip.mp4\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "abc123",
            "secure_url": "https://cdn.example.com/demo/video/upload/abc123.mp4"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = test_client(&server)
        .upload(b"fake".to_vec(), "clip.mp4", "video/mp4", ResourceType::Video)
        .await
        .expect("upload should succeed");

    assert_eq!(url, "https://cdn.example.com/demo/video/upload/abc123.mp4");
}

#[tokio::test]
async fn upload_uses_resource_type_in_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "secure_url": "https://cdn.example.com/cover.png" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = test_client(&server)
        .upload(b"png".to_vec(), "cover.png", "image/png", ResourceType::Image)
        .await
        .expect("upload should succeed");
    assert_eq!(url, "https://cdn.example.com/cover.png");
}

// ---------------------------------------------------------------------------
// Error variants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_maps_non_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid Signature" }
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .upload(b"x".to_vec(), "track.mp3", "audio/mpeg", ResourceType::Raw)
        .await
        .expect_err("401 should fail");

    match err {
        StorageError::UnexpectedStatus { status, url } => {
            assert_eq!(status, 401);
            assert!(url.ends_with("/v1_1/demo/raw/upload"), "url was {url}");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_without_secure_url_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "public_id": "abc" })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .upload(b"x".to_vec(), "track.mp3", "audio/mpeg", ResourceType::Raw)
        .await
        .expect_err("missing secure_url should fail");

    assert!(
        matches!(err, StorageError::MissingSecureUrl { ref filename } if filename == "track.mp3"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn upload_with_non_json_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .upload(b"x".to_vec(), "track.mp3", "audio/mpeg", ResourceType::Raw)
        .await
        .expect_err("html body should fail");

    assert!(matches!(err, StorageError::Deserialize { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Signing through the client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_sign_uses_configured_secret() {
    let server = MockServer::start().await;
    let client = test_client(&server);

    let mut params = BTreeMap::new();
    params.insert("timestamp".to_owned(), json!(1_700_000_000));

    assert_eq!(
        client.sign(&params),
        pulsevest_storage::sign_params(&params, "test-secret")
    );
    assert_ne!(
        client.sign(&params),
        pulsevest_storage::sign_params(&params, "other-secret")
    );
}

/// Pulls a text field's value out of a raw multipart body.
fn form_field(body: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\"\r\n\r\n");
    let start = body.find(&marker)? + marker.len();
    let rest = &body[start..];
    let end = rest.find("\r\n")?;
    Some(rest[..end].to_owned())
}

#[tokio::test]
async fn upload_sends_sha1_signature_of_timestamp() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/raw/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "secure_url": "https://cdn.example.com/a.mp3" })),
        )
        .mount(&server)
        .await;

    test_client(&server)
        .upload(b"audio".to_vec(), "a.mp3", "audio/mpeg", ResourceType::Raw)
        .await
        .expect("upload should succeed");

    let requests = server.received_requests().await.expect("request recording");
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();

    let timestamp: i64 = form_field(&body, "timestamp")
        .expect("timestamp field")
        .parse()
        .expect("numeric timestamp");
    let signature = form_field(&body, "signature").expect("signature field");

    let mut params = BTreeMap::new();
    params.insert("timestamp".to_owned(), json!(timestamp));
    assert_eq!(signature.len(), 40, "SHA-1 hex digest expected");
    assert_eq!(
        signature,
        pulsevest_storage::sign_params(&params, "test-secret")
    );
}
