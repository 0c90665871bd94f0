//! Router-level tests of the receiver and the scrape target.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use bytes::Bytes;

use rw_compliance::cases::{self, ReceiverBehavior};
use rw_compliance::decode::encode;
use rw_compliance::http::types::ReceiverStatus;
use rw_compliance::http::{build_exposition_router, build_router, AppState};
use rw_compliance::proto::{TimeSeries, WriteRequest};
use rw_compliance::storage::{BatchStore, MemoryBatches};

fn server_with(behavior: ReceiverBehavior) -> (TestServer, Arc<MemoryBatches>) {
    let store = Arc::new(MemoryBatches::new());
    let state = AppState::builder()
        .with_batches(store.clone())
        .with_behavior(behavior)
        .build()
        .expect("valid configuration");
    let server = TestServer::new(build_router(state)).expect("test server");
    (server, store)
}

fn write_body() -> Bytes {
    let request = WriteRequest {
        timeseries: vec![TimeSeries::from_pairs(
            &[("__name__", "test"), ("a", "1"), ("job", "test")],
            &[(1_000, 1.0)],
        )],
    };
    Bytes::from(encode(&request).expect("valid request"))
}

fn snappy() -> (HeaderName, HeaderValue) {
    (HeaderName::from_static("content-encoding"), HeaderValue::from_static("snappy"))
}

/// Test a full write over the router and the status endpoint.
#[tokio::test]
async fn test_write_then_status() {
    let (server, store) = server_with(ReceiverBehavior::default());
    let (name, value) = snappy();

    let response = server.post("/api/v1/write").add_header(name, value).bytes(write_body()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(store.len(), 1);

    let status: ReceiverStatus = server.get("/api/v1/status").await.json();
    assert_eq!(status, ReceiverStatus { batches: 1, samples: 1, writes_seen: 1 });
}

/// Test that a corrupt body yields 400 with a descriptive message.
#[tokio::test]
async fn test_corrupt_write_is_bad_request() {
    let (server, store) = server_with(ReceiverBehavior::default());
    let (name, value) = snappy();

    let response = server
        .post("/api/v1/write")
        .add_header(name, value)
        .bytes(Bytes::from_static(b"\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff"))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.text().contains("snappy"));
    assert!(store.is_empty());
}

/// Test that only POST is routed to the write endpoint.
#[tokio::test]
async fn test_write_requires_post() {
    let (server, _) = server_with(ReceiverBehavior::default());
    let response = server.get("/api/v1/write").expect_failure().await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

/// Test the retry behavior over the router.
#[tokio::test]
async fn test_rejected_then_accepted() {
    let (server, store) = server_with(ReceiverBehavior { reject_first: 2 });

    for _ in 0..2 {
        let (name, value) = snappy();
        let response = server
            .post("/api/v1/write")
            .add_header(name, value)
            .bytes(write_body())
            .expect_failure()
            .await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    let (name, value) = snappy();
    let response = server.post("/api/v1/write").add_header(name, value).bytes(write_body()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(store.len(), 1);
}

/// Test health endpoint.
#[tokio::test]
async fn test_healthz() {
    let (server, _) = server_with(ReceiverBehavior::default());
    let response = server.get("/healthz").await;
    assert_eq!(response.text(), "ok");
}

/// Test that the scrape target serves the case exposition on any path.
#[tokio::test]
async fn test_exposition_router() {
    let case = cases::find("sorted_labels").expect("registered");
    let server = TestServer::new(build_exposition_router(case.exposition)).expect("test server");

    let response = server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("test{b=\"2\",a=\"1\"} 1"));

    let response = server.get("/anything/else").await;
    assert!(response.text().contains("test{b=\"2\",a=\"1\"} 1"));
}
