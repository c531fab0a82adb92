//! Sampling Engine
//!
//! Periodic collection of HTTP endpoint responses into named, time-windowed
//! in-memory buffers. Each registered set owns one polling task; readers
//! query the retained window concurrently.
//!
//! # Architecture
//!
//! - [`SampleWindow`]: bounded, time-ordered buffer of raw samples
//! - [`SampleCollector`]: per-set polling task (fetch, stamp, append)
//! - [`SampleRegistry`]: lifecycle of all sets, keyed by unique name
//! - [`SampleSink`] / [`TimestampExtractor`]: injection seams for delivery
//!   and payload-embedded timestamps
//!
//! # Example
//!
//! ```rust,no_run
//! use periscope::{SampleRegistry, SampleSetConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), periscope::SamplerError> {
//! let registry = SampleRegistry::new();
//! registry
//!     .add_set(
//!         SampleSetConfig::new("app-stats", "http://127.0.0.1:9000/stats")
//!             .with_period(Duration::from_secs(10))
//!             .with_retention(Duration::from_secs(600)),
//!     )
//!     .await?;
//!
//! let recent = registry.read_last_n("app-stats", 5).await?;
//! println!("retained {} samples", recent.len());
//! # Ok(())
//! # }
//! ```

mod collector;
mod error;
mod registry;
mod set;
mod sink;
mod timestamp;
mod window;

pub use collector::SampleCollector;
pub use error::SamplerError;
pub use registry::SampleRegistry;
pub use set::{
    DEFAULT_PERIOD, DEFAULT_RETENTION, DEFAULT_TIMEOUT, HttpMethod, MIN_PERIOD, SampleSetConfig,
};
pub use sink::SampleSink;
pub use timestamp::{SnapshotTimeExtractor, TimestampExtractor};
pub use window::{Sample, SampleWindow};
