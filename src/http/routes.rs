//! HTTP routing for the receiver and the scrape target.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::cases::Exposition;
use crate::http::handlers::*;
use crate::http::state::AppState;

/// Largest accepted write request body.
pub const MAX_WRITE_BYTES: usize = 32 * 1024 * 1024;

/// Build the receiver router.
///
/// # Parameters
///
/// - `state` - Application state with the batch store of the running case
///
/// # Returns
///
/// Returns configured Axum `Router` with the remote write endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/status", get(status))
        // Remote Write API
        .route("/api/v1/write", post(remote_write))
        .layer(DefaultBodyLimit::max(MAX_WRITE_BYTES))
        .with_state(state)
}

/// Build the scrape target router serving one case's exposition.
///
/// # Parameters
///
/// - `exposition` - Exposition of the running case
///
/// # Returns
///
/// Returns configured Axum `Router` answering every GET with the exposition.
pub fn build_exposition_router(exposition: Exposition) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .fallback(metrics)
        .with_state(exposition)
}
