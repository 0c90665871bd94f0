//! Queries and assertions over the batches received during a test case.
//!
//! The free functions are the primitives: they scan every sample of every batch
//! and match label constraints with [`contains`]. [`Checker`] wraps them for
//! case expectations and collects failures instead of stopping at the first one.

use fnv::{FnvHashMap, FnvHashSet};
use thiserror::Error;

use crate::matchers::contains;
use crate::storage::{Batch, DisplayLabels, Label, Sample};

/// A protocol rule broken by one label set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("labels not sorted: {previous:?} before {next:?}")]
    Unsorted { previous: String, next: String },
    #[error("duplicate label name {0:?}")]
    DuplicateName(String),
    #[error("empty value for label {0:?}")]
    EmptyValue(String),
    #[error("missing __name__ label")]
    MissingName,
}

/// A failed expectation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssertionFailure {
    /// No received sample matched the constraint.
    #[error("no sample matched {constraint}")]
    Missing { constraint: String },
    /// A matching sample carried the wrong value.
    #[error("{labels} at {timestamp}: expected {expected}, got {actual}")]
    ValueMismatch { labels: String, timestamp: i64, expected: f64, actual: f64 },
    /// A well-formed payload broke a rule of the protocol.
    #[error("protocol violation in {labels}: {violation}")]
    ProtocolInvariantViolation { labels: String, violation: Violation },
    /// A request header was missing or wrong.
    #[error("batch {seq}: header {header} expected {expected:?}, got {actual:?}")]
    HeaderMismatch { seq: u64, header: &'static str, expected: String, actual: Option<String> },
    /// A series went back in time between samples.
    #[error("{labels}: timestamp {timestamp} received after {previous}")]
    OutOfOrder { labels: String, previous: i64, timestamp: i64 },
    #[error("{0}")]
    Unexpected(String),
}

/// Count samples whose labels contain `constraint`, calling `on_match` for each.
///
/// # Parameters
///
/// - `batches` - Received batches
/// - `constraint` - Required labels, sorted by name
/// - `on_match` - Called with `(timestamp, value)` of every matching sample
///
/// # Returns
///
/// Returns the number of matching samples across all batches.
pub fn count_matching<F>(batches: &[Batch], constraint: &[Label], mut on_match: F) -> usize
where
    F: FnMut(i64, f64),
{
    let mut count = 0;
    for_each_sample(batches, |sample| {
        if contains(&sample.labels, constraint) {
            on_match(sample.timestamp, sample.value);
            count += 1;
        }
    });
    count
}

/// Count samples matching `constraint` and require every one to equal `expected` exactly.
///
/// # Returns
///
/// Returns the number of matching samples.
///
/// # Errors
///
/// Returns `AssertionFailure::ValueMismatch` for the first sample with another value.
pub fn count_matching_exact_value(
    batches: &[Batch],
    constraint: &[Label],
    expected: f64,
) -> Result<usize, AssertionFailure> {
    let mut mismatch = None;
    let count = count_matching(batches, constraint, |timestamp, actual| {
        if actual != expected && mismatch.is_none() {
            mismatch = Some(AssertionFailure::ValueMismatch {
                labels: DisplayLabels(constraint).to_string(),
                timestamp,
                expected,
                actual,
            });
        }
    });
    mismatch.map_or(Ok(count), Err)
}

/// Call `f` with every sample of every batch, in arrival then wire order.
pub fn for_each_sample<'a, F>(batches: &'a [Batch], mut f: F)
where
    F: FnMut(&'a Sample),
{
    for batch in batches {
        for sample in &batch.samples {
            f(sample);
        }
    }
}

/// Compare two values with a relative tolerance.
///
/// Two NaNs compare equal, infinities only equal the same infinity.
///
/// # Parameters
///
/// - `expected` - Reference value
/// - `actual` - Observed value
/// - `tolerance` - Allowed relative difference, e.g. `0.01` for one percent
pub fn approx_eq(expected: f64, actual: f64, tolerance: f64) -> bool {
    if expected.is_nan() || actual.is_nan() {
        return expected.is_nan() && actual.is_nan();
    }
    if expected.is_infinite() || actual.is_infinite() {
        return expected == actual;
    }
    (expected - actual).abs() <= tolerance * expected.abs().max(actual.abs())
}

/// Check one label set against the protocol rules.
///
/// # Returns
///
/// Returns every violation found, empty if the label set is valid.
pub fn label_violations(labels: &[Label]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen = FnvHashSet::default();

    for (i, label) in labels.iter().enumerate() {
        if !seen.insert(label.name.as_str()) {
            violations.push(Violation::DuplicateName(label.name.clone()));
        }
        if label.value.is_empty() {
            violations.push(Violation::EmptyValue(label.name.clone()));
        }
        if let Some(previous) = i.checked_sub(1).map(|p| &labels[p]) {
            if previous.name > label.name {
                violations.push(Violation::Unsorted {
                    previous: previous.name.clone(),
                    next: label.name.clone(),
                });
            }
        }
    }
    if !labels.iter().any(|l| l.name == "__name__") {
        violations.push(Violation::MissingName);
    }

    violations
}

/// Whether label names are in non-decreasing order.
pub fn labels_sorted(labels: &[Label]) -> bool {
    labels.windows(2).all(|w| w[0].name <= w[1].name)
}

/// Check that every series' timestamps never go backwards in arrival order.
///
/// # Returns
///
/// Returns one `OutOfOrder` failure per offending sample.
pub fn series_ordering(batches: &[Batch]) -> Vec<AssertionFailure> {
    let mut last_seen: FnvHashMap<String, i64> = FnvHashMap::default();
    let mut failures = Vec::new();

    for_each_sample(batches, |sample| {
        let key = DisplayLabels(&sample.labels).to_string();
        match last_seen.get_mut(&key) {
            Some(previous) if sample.timestamp < *previous => {
                failures.push(AssertionFailure::OutOfOrder {
                    labels: key,
                    previous: *previous,
                    timestamp: sample.timestamp,
                });
            }
            Some(previous) => *previous = sample.timestamp,
            None => {
                last_seen.insert(key, sample.timestamp);
            }
        }
    });

    failures
}

/// Collects failures while a case expectation runs.
///
/// Failures are deduplicated so a violation repeated by every scrape is reported once.
pub struct Checker<'a> {
    batches: &'a [Batch],
    tolerance: f64,
    failures: Vec<AssertionFailure>,
    reported: FnvHashSet<String>,
}

impl<'a> Checker<'a> {
    /// Create a checker over the batches of one run.
    ///
    /// # Parameters
    ///
    /// - `batches` - Received batches
    /// - `tolerance` - Relative tolerance for time-varying values
    pub fn new(batches: &'a [Batch], tolerance: f64) -> Self {
        Self { batches, tolerance, failures: Vec::new(), reported: FnvHashSet::default() }
    }

    pub fn batches(&self) -> &'a [Batch] {
        self.batches
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Record a failure.
    pub fn fail(&mut self, failure: AssertionFailure) {
        if self.reported.insert(failure.to_string()) {
            self.failures.push(failure);
        }
    }

    /// Require at least one sample matching the constraint pairs.
    ///
    /// # Returns
    ///
    /// Returns the number of matching samples.
    pub fn expect_present(&mut self, pairs: &[(&str, &str)]) -> usize {
        let constraint = crate::matchers::constraint(pairs);
        let count = count_matching(self.batches, &constraint, |_, _| {});
        if count == 0 {
            self.fail(AssertionFailure::Missing {
                constraint: DisplayLabels(&constraint).to_string(),
            });
        }
        count
    }

    /// Require at least one matching sample, and that all matching samples equal `expected`.
    pub fn expect_value(&mut self, pairs: &[(&str, &str)], expected: f64) {
        let constraint = crate::matchers::constraint(pairs);
        match count_matching_exact_value(self.batches, &constraint, expected) {
            Ok(0) => self.fail(AssertionFailure::Missing {
                constraint: DisplayLabels(&constraint).to_string(),
            }),
            Ok(_) => {}
            Err(failure) => self.fail(failure),
        }
    }

    /// Require at least one matching sample, and run `check` on each of them.
    ///
    /// `check` receives `(timestamp, value)` and returns a description of the problem, if any.
    pub fn expect_each<F>(&mut self, pairs: &[(&str, &str)], mut check: F)
    where
        F: FnMut(i64, f64) -> Option<String>,
    {
        let constraint = crate::matchers::constraint(pairs);
        let mut problems = Vec::new();
        let count = count_matching(self.batches, &constraint, |timestamp, value| {
            if let Some(problem) = check(timestamp, value) {
                problems.push(problem);
            }
        });

        if count == 0 {
            self.fail(AssertionFailure::Missing {
                constraint: DisplayLabels(&constraint).to_string(),
            });
        }
        for problem in problems {
            self.fail(AssertionFailure::Unexpected(format!(
                "{}: {problem}",
                DisplayLabels(&constraint)
            )));
        }
    }

    /// Run `check` on every received sample regardless of its labels.
    pub fn expect_every_sample<F>(&mut self, mut check: F)
    where
        F: FnMut(&Sample) -> Option<AssertionFailure>,
    {
        let mut found = Vec::new();
        for_each_sample(self.batches, |sample| {
            if let Some(failure) = check(sample) {
                found.push(failure);
            }
        });
        for failure in found {
            self.fail(failure);
        }
    }

    /// Require every received label set to satisfy the protocol rules.
    pub fn expect_protocol_invariants(&mut self) {
        self.expect_every_sample(|sample| {
            label_violations(&sample.labels).into_iter().next().map(|violation| {
                AssertionFailure::ProtocolInvariantViolation {
                    labels: DisplayLabels(&sample.labels).to_string(),
                    violation,
                }
            })
        });
    }

    /// Require at least one batch to have arrived.
    pub fn expect_batches(&mut self) {
        if self.batches.is_empty() {
            self.fail(AssertionFailure::Unexpected("no write requests received".into()));
        }
    }

    /// Finish the check.
    ///
    /// # Returns
    ///
    /// Returns all recorded failures, empty when the expectation passed.
    pub fn finish(self) -> Vec<AssertionFailure> {
        self.failures
    }
}
