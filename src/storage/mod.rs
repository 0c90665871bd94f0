//! Received sample model and batch storage abstractions.
//!
//! Every inbound remote write request becomes one [`Batch`]. Batches are kept in
//! arrival order by a [`BatchStore`] that lives exactly as long as one test case.

pub mod memory;

// Re-export main implementations
pub use memory::MemoryBatches;

use std::fmt;

/// Storage abstraction for the batches received during one test case run.
///
/// Implementations must accept concurrent appends from many request handlers.
/// A batch is appended whole: its samples are never interleaved with another batch.
pub trait BatchStore: Send + Sync {
    /// Append a decoded batch.
    ///
    /// # Parameters
    ///
    /// - `batch` - Batch to store, its `seq` is overwritten with the arrival number
    ///
    /// # Returns
    ///
    /// Returns the arrival sequence number assigned to the batch.
    fn append(&self, batch: Batch) -> u64;

    /// Copy out every batch received so far, ordered by arrival.
    fn snapshot(&self) -> Vec<Batch>;

    /// Number of batches received so far.
    fn len(&self) -> usize;

    /// Total number of samples across all batches received so far.
    fn sample_count(&self) -> usize;

    /// Whether no batch has been received yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A metric label representing a name=value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    /// Create a new label with the given name and value.
    ///
    /// # Parameters
    ///
    /// - `name` - Label name
    /// - `value` - Label value
    ///
    /// # Returns
    ///
    /// Returns a new `Label` instance.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Formats a label set the way the exposition format writes it: `{a="1", b="2"}`.
pub struct DisplayLabels<'a>(pub &'a [Label]);

impl fmt::Display for DisplayLabels<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", label.name, label.value)?;
        }
        f.write_str("}")
    }
}

/// A single received sample: one point of one series, with the series' labels
/// exactly as they appeared on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<Label>,
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    ///
    /// # Parameters
    ///
    /// - `labels` - Label set in wire order
    /// - `timestamp` - Timestamp in milliseconds since Unix epoch
    /// - `value` - Metric value
    ///
    /// # Returns
    ///
    /// Returns a new `Sample` instance.
    pub const fn new(labels: Vec<Label>, timestamp: i64, value: f64) -> Self {
        Self { labels, timestamp, value }
    }
}

/// Protocol headers observed on the request that carried a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub content_encoding: Option<String>,
    pub content_type: Option<String>,
    pub protocol_version: Option<String>,
    pub user_agent: Option<String>,
}

/// All samples decoded from one write request, in wire order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Arrival sequence number, assigned by the store
    pub seq: u64,
    /// Headers of the request that carried this batch
    pub meta: RequestMeta,
    /// Samples in (series, point) order
    pub samples: Vec<Sample>,
}

impl Batch {
    /// Create a batch from decoded samples.
    ///
    /// # Parameters
    ///
    /// - `samples` - Decoded samples in wire order
    ///
    /// # Returns
    ///
    /// Returns a new `Batch` with default metadata and sequence number `0`.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { seq: 0, meta: RequestMeta::default(), samples }
    }

    /// Attach request metadata.
    pub fn with_meta(mut self, meta: RequestMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the batch carries no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
