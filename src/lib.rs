//! Periscope - Windowed HTTP Endpoint Sampler
//!
//! Periscope polls HTTP endpoints on fixed periods and keeps each endpoint's
//! raw responses in a bounded, time-ordered in-memory window. Windows are
//! queried concurrently over a REST API and can feed a time-series store.
//! It runs as the `periscope` binary or embeds as a library.
//!
//! # Architecture
//!
//! - **Sampler**: per-set polling tasks, windows, and the name registry
//! - **Server**: REST API over the registry (declare, remove, read)
//! - **Export**: delivery of retained samples to external stores
//! - **Extract**: JSON-path projection of windows onto `(x, y)` series
//!
//! # Example
//!
//! ```rust,no_run
//! use periscope::{AppState, SampleRegistry, SampleSetConfig, create_router};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SampleRegistry::new();
//! registry
//!     .add_set(SampleSetConfig::new(
//!         "app-stats",
//!         "http://127.0.0.1:9000/stats",
//!     ))
//!     .await?;
//!
//! let app = create_router(AppState {
//!     registry: registry.clone(),
//! });
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod export;
pub mod extract;
pub mod sampler;
pub mod server;

pub use config::{AppConfig, ConfigError, ExportConfig, ServerConfig};
pub use export::InfluxSink;
pub use extract::{ExtractError, SeriesPoint, extract_series};
pub use sampler::{
    HttpMethod, Sample, SampleCollector, SampleRegistry, SampleSetConfig, SampleSink,
    SampleWindow, SamplerError, SnapshotTimeExtractor, TimestampExtractor,
};
pub use server::{AppState, create_router};
