//! Sampler error types.

use thiserror::Error;

/// Errors surfaced by [`SampleRegistry`](super::SampleRegistry) operations.
///
/// Failures inside a running collector task (network errors, bad status
/// codes, stale samples) are logged by the task and absorbed; they never
/// surface through this type.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// A set with this name is already registered.
    #[error("sample set '{0}' already exists")]
    DuplicateName(String),

    /// No set with this name is registered.
    #[error("no sample set named '{0}'")]
    UnknownName(String),

    /// The set declaration failed validation.
    #[error("invalid sample set config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SamplerError::DuplicateName("cpu".to_string()).to_string(),
            "sample set 'cpu' already exists"
        );
        assert_eq!(
            SamplerError::UnknownName("gone".to_string()).to_string(),
            "no sample set named 'gone'"
        );
    }
}
