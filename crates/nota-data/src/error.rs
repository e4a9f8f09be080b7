//! Error types for the data access layer.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use argon2::password_hash::Error as PasswordHashError;

/// Result alias for data layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the data access layer.
#[derive(Debug)]
pub enum DataError {
    /// Migration execution failed.
    MigrationFailed {
        /// Underlying migration error.
        source: sqlx::migrate::MigrateError,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// Failed to hash secret material.
    SecretHashFailed {
        /// Hashing error detail.
        detail: PasswordHashError,
    },
    /// Stored secret hash payload was invalid.
    StoredHashInvalid {
        /// Hash parsing error detail.
        detail: PasswordHashError,
    },
    /// Secret verification failed.
    SecretVerifyFailed {
        /// Verification error detail.
        detail: PasswordHashError,
    },
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MigrationFailed { .. } => formatter.write_str("migration failed"),
            Self::QueryFailed { .. } => formatter.write_str("database operation failed"),
            Self::SecretHashFailed { .. } => formatter.write_str("failed to hash secret material"),
            Self::StoredHashInvalid { .. } => formatter.write_str("invalid stored hash"),
            Self::SecretVerifyFailed { .. } => formatter.write_str("failed to verify secret"),
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MigrationFailed { source } => Some(source),
            Self::QueryFailed { source, .. } => Some(source),
            Self::SecretHashFailed { .. }
            | Self::StoredHashInvalid { .. }
            | Self::SecretVerifyFailed { .. } => None,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(source: sqlx::Error) -> Self {
        Self::QueryFailed {
            operation: "sqlx operation",
            source,
        }
    }
}
