//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("invalid configuration variable")]
    InvalidVar {
        /// Name of the offending variable.
        name: &'static str,
        /// Offending value as supplied.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Bind address value was invalid.
    #[error("invalid bind address")]
    InvalidBindAddr {
        /// Bind address payload provided by the caller.
        value: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
