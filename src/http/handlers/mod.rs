//! HTTP handlers for the receiver and the scrape target.

pub mod exposition;
pub mod health;
pub mod remote_write;

// Re-export handlers for easier access
pub use exposition::metrics;
pub use health::{healthz, status};
pub use remote_write::remote_write;
