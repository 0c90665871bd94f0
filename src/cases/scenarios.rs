//! The compliance scenarios.

use time::OffsetDateTime;

use crate::assertions::{
    approx_eq, for_each_sample, label_violations, labels_sorted, series_ordering,
};
use crate::assertions::{AssertionFailure, Checker, Violation};
use crate::cases::{Exposition, ReceiverBehavior, TestCase, JOB};
use crate::decode::Encoding;
use crate::storage::DisplayLabels;

const SIMPLE: &str = "# HELP test A test metric.\n# TYPE test gauge\ntest{a=\"1\"} 1\n";

fn case(
    name: &'static str,
    description: &'static str,
    exposition: Exposition,
    expectation: fn(&mut Checker<'_>),
) -> TestCase {
    TestCase {
        name,
        description,
        exposition,
        receiver: ReceiverBehavior { reject_first: 0 },
        expectation,
    }
}

pub(super) fn all() -> Vec<TestCase> {
    vec![
        case("up", "healthy target reports up=1", Exposition::Text(SIMPLE), up),
        case(
            "invalid",
            "unparsable exposition reports up=0",
            Exposition::Text("invalid{ metric text\n"),
            invalid,
        ),
        case(
            "counter",
            "counter value is forwarded",
            Exposition::Text(
                "# HELP test_counter A test counter.\n# TYPE test_counter counter\ntest_counter 1\n",
            ),
            counter,
        ),
        case(
            "gauge",
            "gauge value is forwarded",
            Exposition::Text(
                "# HELP test_gauge A test gauge.\n# TYPE test_gauge gauge\ntest_gauge 2\n",
            ),
            gauge,
        ),
        case(
            "histogram",
            "histogram buckets, sum and count are forwarded",
            Exposition::Text(concat!(
                "# HELP test_histogram A test histogram.\n",
                "# TYPE test_histogram histogram\n",
                "test_histogram_bucket{le=\"0.1\"} 0\n",
                "test_histogram_bucket{le=\"1\"} 1\n",
                "test_histogram_bucket{le=\"10\"} 2\n",
                "test_histogram_bucket{le=\"+Inf\"} 3\n",
                "test_histogram_sum 11.5\n",
                "test_histogram_count 3\n",
            )),
            histogram,
        ),
        case(
            "summary",
            "summary quantiles, sum and count are forwarded",
            Exposition::Text(concat!(
                "# HELP test_summary A test summary.\n",
                "# TYPE test_summary summary\n",
                "test_summary{quantile=\"0.5\"} 1\n",
                "test_summary{quantile=\"0.9\"} 5\n",
                "test_summary_sum 11.5\n",
                "test_summary_count 3\n",
            )),
            summary,
        ),
        case(
            "job_label",
            "every sample carries the job label",
            Exposition::Text(SIMPLE),
            job_label,
        ),
        case(
            "instance_label",
            "every sample carries a non-empty instance label",
            Exposition::Text(SIMPLE),
            instance_label,
        ),
        case("name_label", "every sample carries __name__", Exposition::Text(SIMPLE), name_label),
        case(
            "honor_labels",
            "target-exposed job label is renamed to exported_job",
            Exposition::Text("# TYPE test gauge\ntest{job=\"other\"} 1\n"),
            honor_labels,
        ),
        case(
            "empty_labels",
            "labels with empty values are dropped",
            Exposition::Text("# TYPE test gauge\ntest{a=\"\",b=\"2\"} 1\n"),
            empty_labels,
        ),
        case(
            "repeated_labels",
            "repeated label names fail the scrape",
            Exposition::Text("# TYPE test gauge\ntest{a=\"1\",a=\"1\"} 1\n"),
            repeated_labels,
        ),
        case(
            "sorted_labels",
            "label sets are sent sorted by name",
            Exposition::Text("# TYPE test gauge\ntest{b=\"2\",a=\"1\"} 1\n"),
            sorted_labels,
        ),
        case(
            "timestamp",
            "sample timestamps match the scrape time",
            Exposition::Generated(now_gauge),
            timestamp,
        ),
        case(
            "nan",
            "NaN values are forwarded",
            Exposition::Text("# TYPE test_nan gauge\ntest_nan NaN\n"),
            nan,
        ),
        case(
            "inf",
            "infinite values are forwarded",
            Exposition::Text(
                "# TYPE test_inf gauge\ntest_inf{sign=\"pos\"} +Inf\ntest_inf{sign=\"neg\"} -Inf\n",
            ),
            inf,
        ),
        case(
            "ordering",
            "samples of a series arrive in timestamp order",
            Exposition::Text(SIMPLE),
            ordering,
        ),
        case(
            "headers",
            "write requests carry the protocol headers",
            Exposition::Text(SIMPLE),
            headers,
        ),
        TestCase {
            receiver: ReceiverBehavior { reject_first: 1 },
            ..case("retries", "rejected writes are retried", Exposition::Text(SIMPLE), retries)
        },
    ]
}

/// Renders the current wall clock in seconds as a gauge named `now`.
fn now_gauge(now: OffsetDateTime) -> String {
    let seconds = now.unix_timestamp_nanos() as f64 / 1e9;
    format!("# HELP now The current time in seconds.\n# TYPE now gauge\nnow {seconds}\n")
}

fn up(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "up"), ("job", JOB)], 1.0);
    c.expect_value(&[("__name__", "test"), ("a", "1")], 1.0);
}

fn invalid(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "up"), ("job", JOB)], 0.0);
}

fn counter(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "test_counter")], 1.0);
}

fn gauge(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "test_gauge")], 2.0);
}

/// Requires a `test_histogram_bucket` sample whose `le` parses to `bound`.
///
/// Bounds are compared as numbers since senders may rewrite `le="1"` as `le="1.0"`.
fn expect_bucket(c: &mut Checker<'_>, bound: f64, expected: f64) {
    let mut seen = false;
    let mut mismatch = None;
    for_each_sample(c.batches(), |sample| {
        let mut is_bucket = false;
        let mut le = None;
        for label in &sample.labels {
            match label.name.as_str() {
                "__name__" => is_bucket = label.value == "test_histogram_bucket",
                "le" => le = label.value.parse::<f64>().ok(),
                _ => {}
            }
        }
        if !is_bucket || le != Some(bound) {
            return;
        }
        seen = true;
        if sample.value != expected && mismatch.is_none() {
            mismatch = Some(AssertionFailure::ValueMismatch {
                labels: DisplayLabels(&sample.labels).to_string(),
                timestamp: sample.timestamp,
                expected,
                actual: sample.value,
            });
        }
    });

    if let Some(failure) = mismatch {
        c.fail(failure);
    } else if !seen {
        c.fail(AssertionFailure::Missing {
            constraint: format!("{{__name__=\"test_histogram_bucket\", le=\"{bound}\"}}"),
        });
    }
}

fn histogram(c: &mut Checker<'_>) {
    for (bound, count) in [(0.1, 0.0), (1.0, 1.0), (10.0, 2.0), (f64::INFINITY, 3.0)] {
        expect_bucket(c, bound, count);
    }
    c.expect_value(&[("__name__", "test_histogram_sum")], 11.5);
    c.expect_value(&[("__name__", "test_histogram_count")], 3.0);
}

fn summary(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "test_summary"), ("quantile", "0.5")], 1.0);
    c.expect_value(&[("__name__", "test_summary"), ("quantile", "0.9")], 5.0);
    c.expect_value(&[("__name__", "test_summary_sum")], 11.5);
    c.expect_value(&[("__name__", "test_summary_count")], 3.0);
}

/// Fails every sample that lacks `name` or carries it with an empty value.
fn require_label(c: &mut Checker<'_>, name: &'static str) {
    c.expect_every_sample(|sample| {
        let present = sample.labels.iter().any(|l| l.name == name && !l.value.is_empty());
        (!present).then(|| {
            AssertionFailure::Unexpected(format!(
                "{} has no {name} label",
                DisplayLabels(&sample.labels)
            ))
        })
    });
}

fn job_label(c: &mut Checker<'_>) {
    c.expect_present(&[("__name__", "up"), ("job", JOB)]);
    require_label(c, "job");
}

fn instance_label(c: &mut Checker<'_>) {
    c.expect_present(&[("__name__", "up")]);
    require_label(c, "instance");
}

fn name_label(c: &mut Checker<'_>) {
    c.expect_batches();
    c.expect_every_sample(|sample| {
        label_violations(&sample.labels).contains(&Violation::MissingName).then(|| {
            AssertionFailure::ProtocolInvariantViolation {
                labels: DisplayLabels(&sample.labels).to_string(),
                violation: Violation::MissingName,
            }
        })
    });
}

fn honor_labels(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "test"), ("exported_job", "other"), ("job", JOB)], 1.0);
}

fn empty_labels(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "test"), ("b", "2")], 1.0);
    c.expect_every_sample(|sample| {
        let empty = sample.labels.iter().find(|l| l.value.is_empty())?;
        Some(AssertionFailure::ProtocolInvariantViolation {
            labels: DisplayLabels(&sample.labels).to_string(),
            violation: Violation::EmptyValue(empty.name.clone()),
        })
    });
}

fn repeated_labels(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "up"), ("job", JOB)], 0.0);
    c.expect_every_sample(|sample| {
        let duplicate = label_violations(&sample.labels)
            .into_iter()
            .find(|v| matches!(v, Violation::DuplicateName(_)))?;
        Some(AssertionFailure::ProtocolInvariantViolation {
            labels: DisplayLabels(&sample.labels).to_string(),
            violation: duplicate,
        })
    });
}

fn sorted_labels(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "test"), ("a", "1"), ("b", "2")], 1.0);
    c.expect_every_sample(|sample| {
        if labels_sorted(&sample.labels) {
            return None;
        }
        let violation = label_violations(&sample.labels)
            .into_iter()
            .find(|v| matches!(v, Violation::Unsorted { .. }))?;
        Some(AssertionFailure::ProtocolInvariantViolation {
            labels: DisplayLabels(&sample.labels).to_string(),
            violation,
        })
    });
}

fn timestamp(c: &mut Checker<'_>) {
    let tolerance = c.tolerance();
    c.expect_each(&[("__name__", "now")], |ts, value| {
        let scraped_at = ts as f64 / 1000.0;
        (!approx_eq(scraped_at, value, tolerance))
            .then(|| format!("timestamp {scraped_at}s differs from exposed time {value}s"))
    });
}

fn nan(c: &mut Checker<'_>) {
    c.expect_each(&[("__name__", "test_nan")], |_, value| {
        (!value.is_nan()).then(|| format!("expected NaN, got {value}"))
    });
}

fn inf(c: &mut Checker<'_>) {
    c.expect_value(&[("__name__", "test_inf"), ("sign", "pos")], f64::INFINITY);
    c.expect_value(&[("__name__", "test_inf"), ("sign", "neg")], f64::NEG_INFINITY);
}

fn ordering(c: &mut Checker<'_>) {
    c.expect_present(&[("__name__", "test"), ("a", "1")]);
    for failure in series_ordering(c.batches()) {
        c.fail(failure);
    }
}

fn headers(c: &mut Checker<'_>) {
    c.expect_batches();
    for batch in c.batches() {
        let meta = &batch.meta;
        let checks: [(&'static str, &str, Option<&String>, bool); 4] = [
            (
                "Content-Encoding",
                "snappy",
                meta.content_encoding.as_ref(),
                meta.content_encoding
                    .as_deref()
                    .is_some_and(|v| Encoding::from_header(Some(v)).is_ok()),
            ),
            (
                "Content-Type",
                "application/x-protobuf",
                meta.content_type.as_ref(),
                meta.content_type.as_deref() == Some("application/x-protobuf"),
            ),
            (
                "X-Prometheus-Remote-Write-Version",
                "0.1.0",
                meta.protocol_version.as_ref(),
                meta.protocol_version.as_deref().is_some_and(|v| v.starts_with("0.1.")),
            ),
            (
                "User-Agent",
                "any",
                meta.user_agent.as_ref(),
                meta.user_agent.as_deref().is_some_and(|v| !v.is_empty()),
            ),
        ];

        for (header, expected, actual, ok) in checks {
            if !ok {
                c.fail(AssertionFailure::HeaderMismatch {
                    seq: batch.seq,
                    header,
                    expected: expected.to_string(),
                    actual: actual.cloned(),
                });
            }
        }
    }
}

fn retries(c: &mut Checker<'_>) {
    c.expect_batches();
    c.expect_value(&[("__name__", "test"), ("a", "1")], 1.0);
}
