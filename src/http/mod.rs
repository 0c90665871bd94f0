//! HTTP servers: the remote write receiver and the per-case scrape target.

pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

pub use routes::{build_exposition_router, build_router};
pub use state::AppState;
