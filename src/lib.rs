//! # Remote Write Compliance Library
//!
//! A harness checking that Prometheus Remote Write senders translate scraped
//! metrics into the wire protocol correctly.
//!
//! This library provides components for:
//! - **Receiver**: Accepts snappy-compressed remote write requests and decodes them into batches
//! - **Label Matching**: Linear subset matching over sorted label sets
//! - **Assertions**: Presence, value, tolerance and protocol-invariant checks over received batches
//! - **Test Cases**: A catalogue of scrape targets paired with expectations
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use rw_compliance::cases;
//! use rw_compliance::runner::{evaluate, RunningCase};
//!
//! # async fn example() -> std::io::Result<()> {
//! let case = cases::find("up").expect("registered case");
//! let running = RunningCase::start(
//!     case,
//!     "127.0.0.1:19095".parse().expect("valid address"),
//!     "127.0.0.1:19096".parse().expect("valid address"),
//! )
//! .await?;
//!
//! // Point the sender under test at both endpoints, then wait.
//! tokio::time::sleep(Duration::from_secs(15)).await;
//!
//! let (case, batches) = running.close().await;
//! let report = evaluate(&case, &batches, 1e-7);
//! println!("{}: {}", report.name, report.passed);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod cases;
pub mod config;
pub mod decode;
pub mod http;
pub mod matchers;
pub mod proto;
pub mod runner;
pub mod storage;

// Re-export commonly used types for convenience
pub use assertions::{
    count_matching, count_matching_exact_value, for_each_sample, AssertionFailure, Checker,
};
pub use cases::TestCase;
pub use decode::{decode, DecodeError};
pub use matchers::contains;
pub use storage::{Batch, BatchStore, Label, MemoryBatches, Sample};
