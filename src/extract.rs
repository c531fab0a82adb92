//! Series extraction from sample payloads.
//!
//! Projects a run of JSON samples onto `(x, y)` points for charting or
//! downstream analysis: x is the sample time as fractional unix seconds, y
//! is a JSON path query over the payload. Extraction is all-or-nothing; one
//! bad payload fails the whole series rather than silently dropping points.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json_path::JsonPath;
use thiserror::Error;

use crate::sampler::Sample;

/// Series extraction error types.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The JSON path expression itself does not parse.
    #[error("invalid JSON path: {0}")]
    InvalidPath(#[from] serde_json_path::ParseError),

    /// A sample could not be projected onto the path.
    #[error("sample at {time}: {reason}")]
    BadSample {
        /// Timestamp of the offending sample.
        time: DateTime<Utc>,
        /// What went wrong with it.
        reason: String,
    },
}

/// One extracted point: sample time (fractional unix seconds) and the
/// numeric value found at the query path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Sample time as fractional unix seconds.
    pub x: f64,
    /// Value at the query path.
    pub y: f64,
}

/// Project `samples` onto `(time, value)` points using a JSON path query.
///
/// Point order follows the input slice. Every sample must be valid JSON and
/// must hold a numeric value at `path`; the first sample that does not fails
/// the whole extraction.
///
/// # Errors
/// `InvalidPath` when the expression does not parse; `BadSample` when any
/// payload is not JSON, has no value at the path, or the value is not a
/// number.
pub fn extract_series(samples: &[Sample], path: &str) -> Result<Vec<SeriesPoint>, ExtractError> {
    let query = path.parse::<JsonPath>()?;

    let mut points = Vec::with_capacity(samples.len());
    for sample in samples {
        let value: serde_json::Value =
            serde_json::from_slice(&sample.payload).map_err(|e| ExtractError::BadSample {
                time: sample.time,
                reason: format!("payload is not valid JSON: {e}"),
            })?;

        let y = query
            .query(&value)
            .first()
            .and_then(|node| node.as_f64())
            .ok_or_else(|| ExtractError::BadSample {
                time: sample.time,
                reason: format!("no numeric value at path '{path}'"),
            })?;

        points.push(SeriesPoint {
            x: sample.time.timestamp_micros() as f64 / 1e6,
            y,
        });
    }
    Ok(points)
}
