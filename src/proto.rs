//! Protobuf messages of the Prometheus Remote Write 1.0 protocol.
//!
//! Only the fields the receiver reads are declared. Anything else a sender
//! puts on the wire (metadata, exemplars, histograms) is skipped by prost.

/// Top-level message of a remote write request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// One series: its label set and the points sent for it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Label {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sample {
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Milliseconds since Unix epoch
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

impl TimeSeries {
    /// Build a series from `(name, value)` label pairs and `(timestamp, value)` points.
    pub fn from_pairs(labels: &[(&str, &str)], points: &[(i64, f64)]) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|(name, value)| Label {
                    name: (*name).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
            samples: points.iter().map(|&(timestamp, value)| Sample { value, timestamp }).collect(),
        }
    }
}
