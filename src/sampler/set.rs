//! Sample set declarations.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::sampler::error::SamplerError;

// =============================================================================
// Constants
// =============================================================================

/// Default polling period (10 seconds).
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

/// Default retention span (10 minutes).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

/// Default per-request timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum allowed polling period. Shorter periods are clamped; the interval
/// timer cannot run with a zero period.
pub const MIN_PERIOD: Duration = Duration::from_millis(10);

fn default_period() -> Duration {
    DEFAULT_PERIOD
}

fn default_retention() -> Duration {
    DEFAULT_RETENTION
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

// =============================================================================
// Types
// =============================================================================

/// HTTP method used to poll a sample set's endpoint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    /// HTTP GET (default).
    #[default]
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
    /// HTTP HEAD.
    Head,
    /// HTTP PATCH.
    Patch,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Declaration of one sample set: which endpoint to poll, how, how often,
/// and how long to retain what comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSetConfig {
    /// Unique set name. Doubles as the registry key and the series name on
    /// export.
    pub name: String,

    /// Target URL (HTTP or HTTPS).
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: HttpMethod,

    /// Request headers sent with every poll.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body sent with every poll, if any.
    #[serde(default)]
    pub body: Option<String>,

    /// Polling period (e.g., "10s", "1m").
    #[serde(default = "default_period", with = "humantime_serde")]
    pub period: Duration,

    /// Retention span measured against the newest retained sample
    /// (e.g., "10m", "1h").
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub retention: Duration,

    /// Per-request timeout (e.g., "5s").
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl SampleSetConfig {
    /// Create a config for `name` polling `url`, with defaults for
    /// everything else.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: HttpMethod::default(),
            headers: BTreeMap::new(),
            body: None,
            period: DEFAULT_PERIOD,
            retention: DEFAULT_RETENTION,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the request headers.
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the polling period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the retention span.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Polling period with the [`MIN_PERIOD`] floor applied. Logs a warning
    /// when the configured period is clamped.
    pub fn clamped_period(&self) -> Duration {
        if self.period < MIN_PERIOD {
            tracing::warn!(
                set = %self.name,
                configured = ?self.period,
                minimum = ?MIN_PERIOD,
                "polling period below minimum, clamping"
            );
            MIN_PERIOD
        } else {
            self.period
        }
    }

    /// Validate the declaration.
    ///
    /// # Errors
    /// Returns `SamplerError::InvalidConfig` when the name is empty or the
    /// URL does not parse.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.name.trim().is_empty() {
            return Err(SamplerError::InvalidConfig(
                "set name cannot be empty".to_string(),
            ));
        }
        url::Url::parse(&self.url).map_err(|e| {
            SamplerError::InvalidConfig(format!(
                "set '{}': invalid URL '{}': {}",
                self.name, self.url, e
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_and_display() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_method_default_is_get() {
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
        assert_eq!(reqwest::Method::GET, reqwest::Method::from(HttpMethod::Get));
    }

    #[test]
    fn test_config_defaults() {
        let config = SampleSetConfig::new("cpu", "http://localhost:9000/stats");
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.period, DEFAULT_PERIOD);
        assert_eq!(config.retention, DEFAULT_RETENTION);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.headers.is_empty());
        assert!(config.body.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = SampleSetConfig::new("api", "http://localhost:9000/query")
            .with_method(HttpMethod::Post)
            .with_body(r#"{"q":"stats"}"#)
            .with_period(Duration::from_secs(5))
            .with_retention(Duration::from_secs(120))
            .with_timeout(Duration::from_secs(2));

        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.body.as_deref(), Some(r#"{"q":"stats"}"#));
        assert_eq!(config.period, Duration::from_secs(5));
        assert_eq!(config.retention, Duration::from_secs(120));
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_clamped_period() {
        let config =
            SampleSetConfig::new("fast", "http://localhost:9000/").with_period(Duration::ZERO);
        assert_eq!(config.clamped_period(), MIN_PERIOD);

        let config = SampleSetConfig::new("slow", "http://localhost:9000/")
            .with_period(Duration::from_secs(30));
        assert_eq!(config.clamped_period(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let config = SampleSetConfig::new("", "http://localhost:9000/");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = SampleSetConfig::new("bad", "not-a-url");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_serde_roundtrip_with_humantime_durations() {
        let yaml = r#"
name: snapshots
url: http://127.0.0.1:8086/snapshot
method: POST
period: 250ms
retention: 5m
timeout: 2s
headers:
  Accept: application/json
body: '{"scope":"GLOBAL"}'
"#;
        let config: SampleSetConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "snapshots");
        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.period, Duration::from_millis(250));
        assert_eq!(config.retention, Duration::from_secs(300));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(
            config.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );

        let back = serde_yaml::to_string(&config).unwrap();
        let reparsed: SampleSetConfig = serde_yaml::from_str(&back).unwrap();
        assert_eq!(reparsed.period, config.period);
        assert_eq!(reparsed.retention, config.retention);
    }

    #[test]
    fn test_serde_defaults_apply() {
        let config: SampleSetConfig =
            serde_yaml::from_str("name: bare\nurl: http://localhost:9000/\n").unwrap();
        assert_eq!(config.period, DEFAULT_PERIOD);
        assert_eq!(config.retention, DEFAULT_RETENTION);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.method, HttpMethod::Get);
    }
}
