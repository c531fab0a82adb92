//! Application configuration structures.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sampler::SampleSetConfig;

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// Export Configuration
// =============================================================================

/// Export configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Full write URL of the time-series store (database and credentials in
    /// the query string). Export is disabled when unset.
    pub influx_url: Option<String>,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Export configuration.
    #[serde(default)]
    pub export: ExportConfig,

    /// Sample sets started at boot.
    #[serde(default)]
    pub sets: Vec<SampleSetConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variable references (`${VAR}`, `${VAR:-default}`) in
    /// header values, request bodies, and the export URL are expanded after
    /// parsing, before validation.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.expand_env();
        config.validate()?;
        Ok(config)
    }

    fn expand_env(&mut self) {
        for set in &mut self.sets {
            for value in set.headers.values_mut() {
                *value = expand_env_vars(value);
            }
            if let Some(body) = &mut set.body {
                *body = expand_env_vars(body);
            }
        }
        if let Some(url) = &mut self.export.influx_url {
            *url = expand_env_vars(url);
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if let Some(url) = &self.export.influx_url {
            url::Url::parse(url).map_err(|e| {
                ConfigError::ValidationError(format!("invalid export URL '{url}': {e}"))
            })?;
        }

        let mut seen_names = HashSet::new();
        for set in &self.sets {
            set.validate()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            if !seen_names.insert(&set.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate sample set name: '{}'",
                    set.name
                )));
            }
        }

        Ok(())
    }
}
