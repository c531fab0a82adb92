//! Sample timestamp resolution.
//!
//! Some endpoints embed the logical capture time of their data inside the
//! response body; a sample stamped with that time lines up with the source
//! system instead of with whenever the poll happened to run. The extractor
//! seam lets a deployment pull that time out; when it cannot, the collector
//! falls back to the wall clock.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Pulls a sample timestamp out of a raw response payload.
///
/// Returning `None` means the payload carries no usable time and the
/// collector should stamp the sample with the wall clock. Implementations
/// must never panic on arbitrary bytes.
pub trait TimestampExtractor: Send + Sync {
    /// Extract the embedded timestamp, if the payload carries one.
    fn extract(&self, payload: &[u8]) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Deserialize)]
struct SnapshotCount {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct SnapshotTime {
    value: i64,
}

/// The snapshot metric shape: a flattened two-level key space where the
/// global snapshot metadata rides alongside the data itself.
#[derive(Debug, Deserialize)]
struct SnapshotBody {
    #[serde(rename = "GLOBAL.snapshot.count")]
    count: SnapshotCount,
    #[serde(rename = "GLOBAL.snapshot.time")]
    time: SnapshotTime,
}

/// Extractor for JSON payloads carrying `GLOBAL.snapshot.time` /
/// `GLOBAL.snapshot.count` metadata, with the capture time as unix seconds
/// under `time.value`.
///
/// Both fields must be present and well-formed; a payload missing either is
/// treated as carrying no timestamp at all, not as time zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotTimeExtractor;

impl TimestampExtractor for SnapshotTimeExtractor {
    fn extract(&self, payload: &[u8]) -> Option<DateTime<Utc>> {
        let snapshot: SnapshotBody = serde_json::from_slice(payload).ok()?;
        tracing::trace!(
            count = snapshot.count.count,
            time = snapshot.time.value,
            "parsed snapshot metadata"
        );
        Utc.timestamp_opt(snapshot.time.value, 0).single()
    }
}
