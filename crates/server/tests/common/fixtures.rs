//! Request helpers and data fixtures.

use super::server::TestServer;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use soundpost_metadata::models::TokenRow;
use soundpost_server::auth::hash_token;
use std::time::Duration;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

/// Create a user with a valid bearer token; returns `(user_id, raw_token)`.
#[allow(dead_code)]
pub async fn create_test_user(server: &TestServer) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    let raw_token = format!("test-token-{}", Uuid::new_v4());

    let token = TokenRow {
        token_id: Uuid::new_v4(),
        user_id,
        token_hash: hash_token(&raw_token),
        description: Some("Test Token".to_string()),
        created_at: OffsetDateTime::now_utc(),
        revoked_at: None,
    };

    server
        .metadata()
        .create_token(&token)
        .await
        .expect("Failed to create token");

    (user_id, raw_token)
}

/// Make a JSON request; returns status and parsed body (Null when empty).
#[allow(dead_code)]
pub async fn json_request(
    server: &TestServer,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let request_body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(request_body).unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Make a raw-body request with optional extra headers; returns status,
/// response headers, and raw body bytes.
#[allow(dead_code)]
pub async fn raw_request(
    server: &TestServer,
    method: &str,
    uri: &str,
    body: Vec<u8>,
    auth_token: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }

    let request = builder.body(Body::from(body)).unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, body_bytes.to_vec())
}

/// Create an inline track over HTTP; returns its ID.
#[allow(dead_code)]
pub async fn create_inline_track(
    server: &TestServer,
    token: &str,
    title: &str,
    payload: &[u8],
) -> Uuid {
    use base64::Engine as _;

    let body = serde_json::json!({
        "title": title,
        "mime_type": "audio/mpeg",
        "payload": base64::engine::general_purpose::STANDARD.encode(payload),
    });

    let (status, json) = json_request(server, "POST", "/v1/tracks", Some(body), Some(token)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
    json["track_id"].as_str().unwrap().parse().unwrap()
}

/// Upload bytes to the cloud bucket via the proxy endpoint and register a
/// track for them; returns `(track_id, object_key)`.
#[allow(dead_code)]
pub async fn create_cloud_track(
    server: &TestServer,
    token: &str,
    title: &str,
    payload: &[u8],
) -> (Uuid, String) {
    let (status, _, body) = raw_request(
        server,
        "POST",
        "/v1/uploads/proxy",
        payload.to_vec(),
        Some(token),
        &[
            ("x-file-name", "song.mp3"),
            ("content-type", "audio/mpeg"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let key = json["key"].as_str().unwrap().to_string();

    let (status, json) = json_request(
        server,
        "POST",
        "/v1/tracks/from-key",
        Some(serde_json::json!({"title": title, "object_key": key})),
        Some(token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "from-key failed: {json}");
    let track_id = json["track_id"].as_str().unwrap().parse().unwrap();

    (track_id, key)
}

/// Poll the transcript endpoint until the track reaches `target` state.
/// Panics after the timeout.
#[allow(dead_code)]
pub async fn wait_for_transcription_state(
    server: &TestServer,
    token: &str,
    track_id: Uuid,
    target: &str,
) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let (status, json) = json_request(
            server,
            "GET",
            &format!("/v1/tracks/{track_id}/transcript"),
            None,
            Some(token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        if json["state"] == target {
            return json;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "track {track_id} never reached state {target}; last: {}",
                json["state"]
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
