//! Export Layer
//!
//! Sinks that deliver retained samples to external time-series stores.
//! Delivery is observational: failures are logged and absorbed, never
//! propagated back into the sampling path.

mod influx;

pub use influx::InfluxSink;
