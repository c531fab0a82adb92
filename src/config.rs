//! Configuration module for the periscope daemon.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Export settings (time-series store write URL)
//! - Sample set declarations started at boot

mod app;
mod validation;

pub use app::{AppConfig, ExportConfig, ServerConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
