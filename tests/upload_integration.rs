//! Integration tests for the upload engine.
//!
//! These tests verify the full queue-drive flow against mock HTTP
//! servers: sequential dispatch, settlement recording, server error
//! propagation, pre-flight rejection, and pause semantics.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use uploader_core::{
    EngineOptions, EngineTuning, HttpClient, NewUpload, StaticTokenProvider, UploadEngine,
    UploadPolicy, UploadStatus,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "secret-token";

fn fast_tuning() -> EngineTuning {
    EngineTuning {
        success_delay: Duration::from_millis(5),
        failure_delay: Duration::from_millis(10),
    }
}

fn engine_for(endpoint: &str, policy: UploadPolicy) -> UploadEngine {
    UploadEngine::new_with_options(
        endpoint,
        HttpClient::new(),
        Arc::new(StaticTokenProvider::new(TOKEN)),
        EngineOptions {
            policy,
            tuning: fast_tuning(),
            snapshots: None,
        },
    )
}

fn pdf(name: &str, size: usize) -> NewUpload {
    NewUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        payload: Bytes::from(vec![b'x'; size]),
    }
}

/// Polls until the drive loop exits (bounded, so a hung loop fails the
/// test instead of blocking forever).
async fn wait_idle(engine: &UploadEngine) {
    for _ in 0..200 {
        if !engine.is_processing() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("drive loop did not finish in time");
}

// ==================== Success Flow ====================

#[tokio::test]
async fn test_two_files_upload_sequentially_in_order() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("authorization", format!("Bearer {TOKEN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    let ids = engine
        .add_items(vec![pdf("a.pdf", 256), pdf("b.pdf", 256)], "Doc", None, None)
        .await;
    wait_idle(&engine).await;

    for id in &ids {
        let item = engine.item(*id).unwrap();
        assert_eq!(item.status, UploadStatus::Success);
        assert_eq!(item.progress, 100);
        assert_eq!(item.result, Some(serde_json::json!({"id": 7})));
        assert!(item.error.is_none());
    }
    assert!(!engine.is_active(), "queue goes idle after draining");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2, "one request per item, never concurrent");
    let first = String::from_utf8_lossy(&requests[0].body).into_owned();
    let second = String::from_utf8_lossy(&requests[1].body).into_owned();
    assert!(first.contains("Doc - Part 1"), "first request carries the first title");
    assert!(second.contains("Doc - Part 2"), "second request carries the second title");
}

#[tokio::test]
async fn test_description_is_sent_when_provided() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    engine
        .add_items(vec![pdf("a.pdf", 64)], "Doc", Some("quarterly numbers"), None)
        .await;
    wait_idle(&engine).await;

    let requests = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(body.contains("quarterly numbers"));
}

// ==================== Server Errors ====================

#[tokio::test]
async fn test_structured_error_detail_becomes_item_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"detail": "Only PDF files are allowed."})),
        )
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    let ids = engine.add_items(vec![pdf("a.pdf", 64)], "Doc", None, None).await;
    wait_idle(&engine).await;

    let item = engine.item(ids[0]).unwrap();
    assert_eq!(item.status, UploadStatus::Error);
    assert_eq!(item.error.as_deref(), Some("Only PDF files are allowed."));
    assert_eq!(item.progress, 0, "progress resets on failure");
}

#[tokio::test]
async fn test_unstructured_error_falls_back_to_status_message() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    let ids = engine.add_items(vec![pdf("a.pdf", 64)], "Doc", None, None).await;
    wait_idle(&engine).await;

    let item = engine.item(ids[0]).unwrap();
    assert_eq!(item.status, UploadStatus::Error);
    assert_eq!(
        item.error.as_deref(),
        Some("Upload failed with HTTP status 500.")
    );
}

#[tokio::test]
async fn test_failed_item_does_not_halt_the_queue() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 2})))
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    let ids = engine
        .add_items(vec![pdf("a.pdf", 64), pdf("b.pdf", 64)], "Doc", None, None)
        .await;
    wait_idle(&engine).await;

    // The first item's failure is recorded and the drive loop carries on.
    let first = engine.item(ids[0]).unwrap();
    assert_eq!(first.status, UploadStatus::Error);
    assert_eq!(
        first.error.as_deref(),
        Some("Upload failed with HTTP status 500.")
    );

    let second = engine.item(ids[1]).unwrap();
    assert_eq!(second.status, UploadStatus::Success);
    assert_eq!(second.result, Some(serde_json::json!({"id": 2})));

    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    assert!(!engine.is_active(), "queue drains and goes idle");
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_network_error() {
    let engine = engine_for("http://127.0.0.1:1/upload", UploadPolicy::default());
    let ids = engine.add_items(vec![pdf("a.pdf", 64)], "Doc", None, None).await;
    wait_idle(&engine).await;

    let item = engine.item(ids[0]).unwrap();
    assert_eq!(item.status, UploadStatus::Error);
    assert!(
        item.error.as_deref().unwrap().contains("network error"),
        "got: {:?}",
        item.error
    );
}

// ==================== Pre-flight Rejection ====================

#[tokio::test]
async fn test_oversize_file_is_never_dispatched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let policy = UploadPolicy {
        max_file_size: 1024,
        ..UploadPolicy::default()
    };
    let engine = engine_for(&format!("{}/upload", mock_server.uri()), policy);
    let ids = engine.add_items(vec![pdf("big.pdf", 2048)], "Doc", None, None).await;
    wait_idle(&engine).await;

    let item = engine.item(ids[0]).unwrap();
    assert_eq!(item.status, UploadStatus::Error);
    assert!(
        item.error
            .as_deref()
            .unwrap()
            .contains("exceeds the maximum allowed size"),
        "got: {:?}",
        item.error
    );
    assert!(
        mock_server.received_requests().await.unwrap().is_empty(),
        "invalid items must not reach the network"
    );
}

// ==================== Pause / Resume ====================

#[tokio::test]
async fn test_pause_keeps_in_flight_item_and_blocks_the_next() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ok": true}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    let ids = engine
        .add_items(vec![pdf("a.pdf", 64), pdf("b.pdf", 64)], "Doc", None, None)
        .await;

    // Wait for the first item to enter flight.
    for _ in 0..100 {
        if engine.item(ids[0]).unwrap().status == UploadStatus::Uploading {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(engine.item(ids[0]).unwrap().status, UploadStatus::Uploading);

    engine.pause().await;
    assert!(!engine.is_active());
    // The in-flight transfer is not aborted by the pause.
    assert_eq!(engine.item(ids[0]).unwrap().status, UploadStatus::Uploading);

    wait_idle(&engine).await;

    // First item settled normally; second never started.
    assert_eq!(engine.item(ids[0]).unwrap().status, UploadStatus::Success);
    assert_eq!(engine.item(ids[1]).unwrap().status, UploadStatus::Pending);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);

    // Resuming picks up where the queue left off.
    engine.start().await;
    wait_idle(&engine).await;
    assert_eq!(engine.item(ids[1]).unwrap().status, UploadStatus::Success);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

// ==================== Retry ====================

#[tokio::test]
async fn test_retry_after_server_recovery_succeeds() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    let ids = engine.add_items(vec![pdf("a.pdf", 64)], "Doc", None, None).await;
    wait_idle(&engine).await;
    assert_eq!(engine.item(ids[0]).unwrap().status, UploadStatus::Error);

    assert!(engine.retry(ids[0]).await, "error items are retryable");
    wait_idle(&engine).await;

    let item = engine.item(ids[0]).unwrap();
    assert_eq!(item.status, UploadStatus::Success);
    assert!(item.error.is_none(), "retry clears the previous error");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

// ==================== Removal During Flight ====================

#[tokio::test]
async fn test_result_for_removed_in_flight_item_is_discarded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ok": true}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let engine = engine_for(&format!("{}/upload", mock_server.uri()), UploadPolicy::default());
    let ids = engine.add_items(vec![pdf("a.pdf", 64)], "Doc", None, None).await;

    for _ in 0..100 {
        if engine.item(ids[0]).map(|item| item.status) == Some(UploadStatus::Uploading) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(engine.remove_item(ids[0]).await);
    wait_idle(&engine).await;

    assert!(engine.item(ids[0]).is_none(), "removed item stays removed");
    assert!(engine.items().is_empty());
}
