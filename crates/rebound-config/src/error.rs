//! Error types for settings resolution.

use thiserror::Error;

/// Primary error type for settings resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was absent or blank.
    #[error("missing required environment variable")]
    MissingVariable {
        /// Name of the absent variable.
        name: &'static str,
    },
    /// An environment variable held a value that failed validation.
    #[error("invalid environment variable")]
    InvalidVariable {
        /// Name of the offending variable.
        name: &'static str,
        /// Value as supplied by the environment.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

/// Convenience alias for settings results.
pub type ConfigResult<T> = Result<T, ConfigError>;
