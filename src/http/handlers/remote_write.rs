//! Remote Write receiver endpoint.
//!
//! Each request body is decoded in full before anything is stored, so a
//! request that fails or is abandoned mid-body never leaves a partial batch.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, warn};

use crate::decode::{decode, DecodeError, Encoding};
use crate::http::handlers::health::admit_write;
use crate::http::state::AppState;
use crate::storage::{BatchStore, RequestMeta};

/// Header carrying the remote write protocol version.
pub const VERSION_HEADER: &str = "x-prometheus-remote-write-version";

/// Handle remote write requests from the sender under test.
///
/// # Parameters
///
/// - `state` - Application state with the batch store and rejection settings
/// - `headers` - HTTP headers, checked for content encoding and recorded per batch
/// - `body` - Request body containing snappy-compressed protobuf
///
/// # Returns
///
/// Returns HTTP 200 on success, or error status with message on failure.
pub async fn remote_write(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Err(code) = admit_write(&state) {
        debug!("rejecting write request for retry scenario");
        return (code, "write rejected by test case").into_response();
    }

    handle_remote_write_impl(state.batches.as_ref(), &headers, &body).into_response()
}

/// Internal implementation of remote write handling.
///
/// # Parameters
///
/// - `batches` - Store to append the decoded batch to
/// - `headers` - HTTP headers, checked for content encoding
/// - `body` - Request body
///
/// # Returns
///
/// Returns HTTP 200 on success, 415 for unknown encodings, 400 for corrupt payloads.
fn handle_remote_write_impl(
    batches: &dyn BatchStore,
    headers: &HeaderMap,
    body: &[u8],
) -> impl IntoResponse {
    let meta = request_meta(headers);

    let decoded = Encoding::from_header(meta.content_encoding.as_deref()).and_then(|encoding| {
        match encoding {
            Encoding::Snappy => decode(body),
        }
    });

    let batch = match decoded {
        Ok(batch) => batch,
        Err(e) => {
            warn!("failed to decode remote write request: {}", e);
            let status = match e {
                DecodeError::UnsupportedEncoding(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                DecodeError::Snappy(_) | DecodeError::Protobuf(_) => StatusCode::BAD_REQUEST,
            };
            return (status, e.to_string()).into_response();
        }
    };

    let samples = batch.len();
    let seq = batches.append(batch.with_meta(meta));
    debug!("received batch {} with {} samples", seq, samples);

    StatusCode::OK.into_response()
}

/// Extract the protocol headers recorded with each batch.
fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);

    RequestMeta {
        content_encoding: get(header::CONTENT_ENCODING.as_str()),
        content_type: get(header::CONTENT_TYPE.as_str()),
        protocol_version: get(VERSION_HEADER),
        user_agent: get(header::USER_AGENT.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderValue;

    use crate::cases::ReceiverBehavior;
    use crate::decode::encode;
    use crate::proto::{TimeSeries, WriteRequest};
    use crate::storage::MemoryBatches;

    use super::*;

    fn payload() -> Bytes {
        let request = WriteRequest {
            timeseries: vec![
                TimeSeries::from_pairs(
                    &[("__name__", "test"), ("a", "1"), ("job", "test")],
                    &[(1_000, 1.0), (2_000, 1.0)],
                ),
                TimeSeries::from_pairs(&[("__name__", "up"), ("job", "test")], &[(1_000, 1.0)]),
            ],
        };
        Bytes::from(encode(&request).expect("valid request"))
    }

    fn sender_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("snappy"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/x-protobuf"));
        headers.insert(VERSION_HEADER, HeaderValue::from_static("0.1.0"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("test-sender/1.0"));
        headers
    }

    fn create_test_state(reject_first: usize) -> (AppState, Arc<MemoryBatches>) {
        let store = Arc::new(MemoryBatches::new());
        let state = AppState::new(store.clone(), ReceiverBehavior { reject_first });
        (state, store)
    }

    /// Test that a valid payload is decoded and stored with its headers.
    #[tokio::test]
    async fn test_remote_write_stores_batch() {
        let (state, store) = create_test_state(0);

        let response = remote_write(State(state), sender_headers(), payload()).await;
        assert_eq!(response.into_response().status(), StatusCode::OK);

        let batches = store.snapshot();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[0].meta.content_encoding.as_deref(), Some("snappy"));
        assert_eq!(batches[0].meta.protocol_version.as_deref(), Some("0.1.0"));
        assert_eq!(batches[0].meta.user_agent.as_deref(), Some("test-sender/1.0"));
        assert_eq!(batches[0].samples[1].timestamp, 2_000);
    }

    /// Test that a missing content encoding is treated as snappy.
    #[tokio::test]
    async fn test_remote_write_without_encoding_header() {
        let (state, store) = create_test_state(0);

        let response = remote_write(State(state), HeaderMap::new(), payload()).await;
        assert_eq!(response.into_response().status(), StatusCode::OK);
        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot()[0].meta, RequestMeta::default());
    }

    /// Test that corrupt payloads are rejected and nothing is stored.
    #[tokio::test]
    async fn test_remote_write_rejects_corrupt_payload() {
        let (state, store) = create_test_state(0);

        let response =
            remote_write(State(state), sender_headers(), Bytes::from_static(&[0xff; 10])).await;
        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        assert!(String::from_utf8_lossy(&body).starts_with("snappy:"));
        assert!(store.is_empty());
    }

    /// Test that unknown content encodings are refused.
    #[tokio::test]
    async fn test_remote_write_rejects_unknown_encoding() {
        let (state, store) = create_test_state(0);
        let mut headers = sender_headers();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));

        let response = remote_write(State(state), headers, payload()).await;
        assert_eq!(response.into_response().status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(store.is_empty());
    }

    /// Test that rejected writes are not stored and later writes are.
    #[tokio::test]
    async fn test_remote_write_retry_scenario() {
        let (state, store) = create_test_state(1);

        let response = remote_write(State(state.clone()), sender_headers(), payload()).await;
        assert_eq!(response.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.is_empty());

        let response = remote_write(State(state), sender_headers(), payload()).await;
        assert_eq!(response.into_response().status(), StatusCode::OK);
        assert_eq!(store.len(), 1);
    }

    /// Test concurrent writers each land as one whole batch.
    #[tokio::test]
    async fn test_remote_write_concurrent() {
        let (state, store) = create_test_state(0);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    remote_write(State(state), sender_headers(), payload()).await.into_response()
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.expect("task").status(), StatusCode::OK);
        }

        let batches = store.snapshot();
        assert_eq!(batches.len(), 16);
        for batch in &batches {
            let timestamps: Vec<i64> = batch.samples.iter().map(|s| s.timestamp).collect();
            assert_eq!(timestamps, [1_000, 2_000, 1_000]);
        }
    }
}
