//! Integration tests for presigned and proxied uploads.

mod common;

use axum::http::StatusCode;
use common::{TestServer, create_test_user, json_request, raw_request};
use serde_json::json;

#[tokio::test]
async fn test_sign_unavailable_without_cloud() {
    // The client falls back to inline upload on this distinct code.
    let server = TestServer::new().await;
    let (_user, token) = create_test_user(&server).await;

    let (status, body) = json_request(
        &server,
        "POST",
        "/v1/uploads/sign",
        Some(json!({"filename": "a.mp3", "content_type": "audio/mpeg"})),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "storage_unavailable");
}

#[tokio::test]
async fn test_sign_unavailable_when_backend_cannot_sign() {
    // The filesystem bucket stores objects but has no signing scheme;
    // presigning degrades the same way as an unconfigured cloud.
    let server = TestServer::builder().with_cloud().build().await;
    let (_user, token) = create_test_user(&server).await;

    let (status, body) = json_request(
        &server,
        "POST",
        "/v1/uploads/sign",
        Some(json!({"filename": "a.mp3", "content_type": "audio/mpeg"})),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "storage_unavailable");
}

#[tokio::test]
async fn test_sign_validation() {
    let server = TestServer::builder().with_cloud().build().await;
    let (_user, token) = create_test_user(&server).await;

    let (status, _) = json_request(
        &server,
        "POST",
        "/v1/uploads/sign",
        Some(json!({"filename": "", "content_type": "audio/mpeg"})),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Batch cap.
    let files: Vec<_> = (0..26)
        .map(|i| json!({"filename": format!("f{i}.mp3"), "content_type": "audio/mpeg"}))
        .collect();
    let (status, body) = json_request(
        &server,
        "POST",
        "/v1/uploads/sign/batch",
        Some(json!({"files": files})),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_proxy_upload_stores_object_under_owner_prefix() {
    let server = TestServer::builder().with_cloud().build().await;
    let (user_id, token) = create_test_user(&server).await;

    let (status, _, body) = raw_request(
        &server,
        "POST",
        "/v1/uploads/proxy",
        b"raw audio bytes".to_vec(),
        Some(&token),
        &[
            ("x-file-name", "My Demo (final).mp3"),
            ("content-type", "audio/mpeg"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let key = json["key"].as_str().unwrap();
    assert!(key.starts_with(&format!("users/{user_id}/audio/")));
    // Unsafe filename characters are sanitized out of the key.
    assert!(key.ends_with("My_Demo__final_.mp3"), "key: {key}");

    let stored = std::fs::read(server.object_path(key)).unwrap();
    assert_eq!(stored, b"raw audio bytes");
}

#[tokio::test]
async fn test_proxy_upload_requires_filename_and_body() {
    let server = TestServer::builder().with_cloud().build().await;
    let (_user, token) = create_test_user(&server).await;

    let (status, _, _) = raw_request(
        &server,
        "POST",
        "/v1/uploads/proxy",
        b"bytes".to_vec(),
        Some(&token),
        &[("content-type", "audio/mpeg")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = raw_request(
        &server,
        "POST",
        "/v1/uploads/proxy",
        Vec::new(),
        Some(&token),
        &[("x-file-name", "a.mp3"), ("content-type", "audio/mpeg")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
