//! Registry of compliance test cases.
//!
//! A case pairs what the scrape target exposes with what the receiver must see
//! afterwards. Cases are plain data built once at startup; the runner wires the
//! exposition to the target endpoint and hands the received batches to the
//! expectation when the window closes.

mod scenarios;

use std::fmt;

use regex::Regex;
use time::OffsetDateTime;

use crate::assertions::{AssertionFailure, Checker};
use crate::storage::Batch;

/// Job name senders under test must be configured to scrape the target with.
pub const JOB: &str = "test";

/// Content served by the scrape target for one case.
#[derive(Debug, Clone, Copy)]
pub enum Exposition {
    /// Fixed text, served as-is on every scrape.
    Text(&'static str),
    /// Text rendered at scrape time from the current wall clock.
    Generated(fn(OffsetDateTime) -> String),
}

impl Exposition {
    /// Render the body for a scrape happening at `now`.
    pub fn render(&self, now: OffsetDateTime) -> String {
        match self {
            Self::Text(text) => (*text).to_string(),
            Self::Generated(render) => render(now),
        }
    }
}

/// How the receiver treats writes while a case runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverBehavior {
    /// Number of leading write requests answered with `500` and discarded
    pub reject_first: usize,
}

/// Expectation evaluated against the batches received during a case.
pub type Expectation = fn(&mut Checker<'_>);

/// A named compliance scenario.
#[derive(Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub exposition: Exposition,
    pub receiver: ReceiverBehavior,
    pub expectation: Expectation,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("exposition", &self.exposition)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

impl TestCase {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluate the expectation against everything received.
    ///
    /// # Parameters
    ///
    /// - `batches` - Batches received while the case was running
    /// - `tolerance` - Relative tolerance for time-varying values
    ///
    /// # Returns
    ///
    /// Returns the failures found, empty when the case passed.
    pub fn evaluate(&self, batches: &[Batch], tolerance: f64) -> Vec<AssertionFailure> {
        let mut checker = Checker::new(batches, tolerance);
        (self.expectation)(&mut checker);
        checker.finish()
    }
}

/// Every registered case, in a stable order.
pub fn catalogue() -> Vec<TestCase> {
    scenarios::all()
}

/// Look up a case by exact name.
pub fn find(name: &str) -> Option<TestCase> {
    catalogue().into_iter().find(|case| case.name == name)
}

/// Cases whose name matches `filter`, or all cases when no filter is given.
pub fn select(filter: Option<&Regex>) -> Vec<TestCase> {
    catalogue()
        .into_iter()
        .filter(|case| filter.map_or(true, |re| re.is_match(case.name)))
        .collect()
}
