//! Time-windowed sample buffer.
//!
//! [`SampleWindow`] is the in-memory store behind every sample set: an
//! append-only ring of timestamped payloads, ordered oldest to newest,
//! bounded by a retention span measured against the newest retained sample.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// One observation of a sampled endpoint: a point in time plus the raw
/// response body captured at that time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Timestamp assigned when the sample was captured. Either extracted
    /// from the payload itself or the wall clock at fetch time.
    pub time: DateTime<Utc>,
    /// Raw response body.
    pub payload: Bytes,
}

impl Sample {
    /// Create a sample from a timestamp and payload.
    pub fn new(time: DateTime<Utc>, payload: impl Into<Bytes>) -> Self {
        Self {
            time,
            payload: payload.into(),
        }
    }
}

/// Bounded, time-ordered buffer of samples for a single set.
///
/// Invariants held across every operation:
///
/// - Sample times are strictly increasing from front (oldest) to back
///   (newest). An append at or before the newest retained time is rejected
///   and leaves the buffer untouched.
/// - After a successful append, every retained sample is within the
///   retention span of the newest sample. Eviction only removes from the
///   oldest end; the newest sample is never evicted.
///
/// The window carries its own lock so readers can query a set concurrently
/// with its collector appending to it.
pub struct SampleWindow {
    retention: Duration,
    samples: RwLock<VecDeque<Sample>>,
}

impl SampleWindow {
    /// Create an empty window retaining samples within `retention` of the
    /// newest sample.
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            samples: RwLock::new(VecDeque::new()),
        }
    }

    /// Retention span this window was created with.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Append a sample, evicting anything that falls out of the retention
    /// span relative to the new sample.
    ///
    /// Returns `false` without mutating the buffer when `sample.time` is not
    /// strictly after the newest retained sample. A sample exactly at the
    /// eviction cutoff (`newest - retention`) is retained.
    pub async fn try_append(&self, sample: Sample) -> bool {
        let mut samples = self.samples.write().await;

        if let Some(newest) = samples.back() {
            if sample.time <= newest.time {
                return false;
            }
        }

        let cutoff = match chrono::Duration::from_std(self.retention) {
            Ok(span) => sample
                .time
                .checked_sub_signed(span)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            // Retention too large for chrono arithmetic: keep everything.
            Err(_) => DateTime::<Utc>::MIN_UTC,
        };
        samples.push_back(sample);
        while let Some(oldest) = samples.front() {
            if oldest.time >= cutoff {
                break;
            }
            samples.pop_front();
        }

        true
    }

    /// Read the `n` most recent samples, newest first. `n == 0` or any `n`
    /// beyond the buffer length returns the entire window.
    pub async fn read_last_n(&self, n: usize) -> Vec<Sample> {
        let samples = self.samples.read().await;
        let take = if n == 0 { samples.len() } else { n.min(samples.len()) };
        samples.iter().rev().take(take).cloned().collect()
    }

    /// Read all samples strictly after `cutoff`, newest first. A sample
    /// exactly at `cutoff` is excluded.
    pub async fn read_since(&self, cutoff: DateTime<Utc>) -> Vec<Sample> {
        let samples = self.samples.read().await;
        samples
            .iter()
            .rev()
            .take_while(|s| s.time > cutoff)
            .cloned()
            .collect()
    }

    /// Number of retained samples.
    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    /// Whether the window currently holds no samples.
    pub async fn is_empty(&self) -> bool {
        self.samples.read().await.is_empty()
    }

    /// Timestamp of the newest retained sample, if any.
    pub async fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.samples.read().await.back().map(|s| s.time)
    }
}

impl std::fmt::Debug for SampleWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleWindow")
            .field("retention", &self.retention)
            .field(
                "len",
                &self.samples.try_read().map(|s| s.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}
