//! API types for HTTP handlers.

use serde::{Deserialize, Serialize};

/// Response of the `/api/v1/status` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverStatus {
    /// Write requests accepted and stored
    pub batches: usize,
    /// Samples across all stored batches
    pub samples: usize,
    /// Write requests seen, including rejected ones
    pub writes_seen: usize,
}
