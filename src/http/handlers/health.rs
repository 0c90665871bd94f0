//! Health check and write admission handlers.

use axum::{extract::State, http::StatusCode, Json};

use crate::http::state::AppState;
use crate::http::types::ReceiverStatus;

/// Health check endpoint.
///
/// # Returns
///
/// Returns "ok" if the server is healthy.
pub async fn healthz() -> &'static str {
    "ok"
}

/// Report what the receiver has stored for the running case.
///
/// # Returns
///
/// Returns batch, sample and write counts as JSON.
pub async fn status(State(state): State<AppState>) -> Json<ReceiverStatus> {
    Json(ReceiverStatus {
        batches: state.batches.len(),
        samples: state.batches.sample_count(),
        writes_seen: state.reject.seen(),
    })
}

/// Refuses the leading writes of a retry scenario.
///
/// Never delays admitted writes.
///
/// # Parameters
///
/// - `state` - Application state with the rejection configuration
///
/// # Returns
///
/// Returns `Ok(())` if the write is admitted, or `Err(StatusCode::INTERNAL_SERVER_ERROR)`
/// if it must be refused so the sender retries.
pub fn admit_write(state: &AppState) -> Result<(), StatusCode> {
    if state.reject.should_reject() {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(())
}
