//! Decoding of snappy-compressed remote write payloads into samples.
//!
//! Label sets are passed through untouched: ordering, duplicates and empty
//! values are exactly what the sender put on the wire.

use prost::Message;
use thiserror::Error;

use crate::proto::WriteRequest;
use crate::storage::{Batch, Label, Sample};

/// Errors that can occur while decoding a write request body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The request declared a compression scheme other than snappy.
    #[error("unsupported content encoding: {0}")]
    UnsupportedEncoding(String),
    /// Snappy block decompression failed.
    #[error("snappy: {0}")]
    Snappy(#[from] snap::Error),
    /// The decompressed bytes are not a `WriteRequest`.
    #[error("protobuf: {0}")]
    Protobuf(#[from] prost::DecodeError),
}

/// Compression schemes accepted on the write endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Snappy,
}

impl Encoding {
    /// Resolve the `Content-Encoding` header value.
    ///
    /// A missing header is treated as snappy, the only encoding remote write 1.0 defines.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnsupportedEncoding` for any other value.
    pub fn from_header(value: Option<&str>) -> Result<Self, DecodeError> {
        match value.map(str::trim) {
            None => Ok(Self::Snappy),
            Some(v) if v.eq_ignore_ascii_case("snappy") => Ok(Self::Snappy),
            Some(other) => Err(DecodeError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Decode a snappy-compressed write request into a batch.
///
/// # Parameters
///
/// - `payload` - Request body as received
///
/// # Returns
///
/// Returns a `Batch` with one sample per (series, point) pair, in wire order.
///
/// # Errors
///
/// Returns `DecodeError` if decompression or protobuf parsing fails.
pub fn decode(payload: &[u8]) -> Result<Batch, DecodeError> {
    // Remote write uses the snappy block format, not the framed one.
    let raw = snap::raw::Decoder::new().decompress_vec(payload)?;
    let request = WriteRequest::decode(raw.as_slice())?;
    Ok(flatten(request))
}

/// Flatten a parsed write request into samples.
pub fn flatten(request: WriteRequest) -> Batch {
    let total = request.timeseries.iter().map(|ts| ts.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);

    for series in request.timeseries {
        let labels: Vec<Label> =
            series.labels.into_iter().map(|l| Label::new(l.name, l.value)).collect();

        for point in series.samples {
            samples.push(Sample::new(labels.clone(), point.timestamp, point.value));
        }
    }

    Batch::new(samples)
}

/// Serialize and snappy-compress a write request the way senders do.
///
/// # Errors
///
/// Returns `DecodeError::Snappy` if compression fails.
pub fn encode(request: &WriteRequest) -> Result<Vec<u8>, DecodeError> {
    let raw = request.encode_to_vec();
    Ok(snap::raw::Encoder::new().compress_vec(&raw)?)
}
