//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse a human-readable duration string.
///
/// Supports formats like `30s`, `1m`, `5m30s`, `2h`, `100ms`.
///
/// # Examples
///
/// ```
/// use periscope::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// assert_eq!(parse_duration("1h30m").unwrap().as_secs(), 5400);
/// ```
///
/// # Errors
/// Returns a description of the problem when the string is empty or does not
/// parse as a duration.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Expand environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax; an unset variable with no
/// default expands to the empty string.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration(" 1h ").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("   ").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("10").is_err());
    }

    #[test]
    fn test_expand_env_vars_untouched_without_vars() {
        assert_eq!(expand_env_vars("plain value"), "plain value");
        assert_eq!(
            expand_env_vars("$HOME is not a braced ref"),
            "$HOME is not a braced ref"
        );
    }

    #[test]
    fn test_expand_env_vars_default_value() {
        let result = expand_env_vars("Bearer ${PERISCOPE_TEST_UNSET_TOKEN:-fallback}");
        assert_eq!(result, "Bearer fallback");
    }

    #[test]
    fn test_expand_env_vars_missing_without_default() {
        assert_eq!(expand_env_vars("x=${PERISCOPE_TEST_UNSET_VALUE}"), "x=");
    }

    #[test]
    fn test_expand_env_vars_from_environment() {
        // SAFETY: test-specific variable, nothing else reads it concurrently.
        unsafe {
            std::env::set_var("PERISCOPE_TEST_EXPAND", "secret");
        }
        assert_eq!(
            expand_env_vars("Authorization: ${PERISCOPE_TEST_EXPAND}"),
            "Authorization: secret"
        );
        // SAFETY: cleanup of the same test variable.
        unsafe {
            std::env::remove_var("PERISCOPE_TEST_EXPAND");
        }
    }
}
