//! Migration-specific error types

use crate::executor::SqlError;
use crate::transaction::TransactionError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Database execution error
    Database(SqlError),
    /// Stored checksum differs from the embedded migration
    ChecksumMismatch {
        version: i64,
        name: String,
        stored: String,
        current: String,
    },
    /// Migration lock timeout
    LockTimeout(String),
    /// Migration failed during execution
    ExecutionFailed {
        version: i64,
        name: String,
        error: String,
    },
    /// Applied migration that this build does not know about
    MissingMigration { version: i64, name: String },
    /// Embedded migration list is not strictly ascending
    InvalidVersion(i64),
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {}", e),
            MigrationError::ChecksumMismatch {
                version,
                name,
                stored,
                current,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) has been modified after being applied.\n\
                     Stored checksum: {}\n\
                     Current checksum: {}",
                    name, version, stored, current
                )
            }
            MigrationError::LockTimeout(msg) => write!(f, "Migration lock timeout: {}", msg),
            MigrationError::ExecutionFailed {
                version,
                name,
                error,
            } => {
                write!(
                    f,
                    "Migration '{}' (version {}) failed during execution: {}",
                    name, version, error
                )
            }
            MigrationError::MissingMigration { version, name } => {
                write!(
                    f,
                    "Database has migration '{}' (version {}) applied, but this build does not \
                     embed it; the database is newer than the binary",
                    name, version
                )
            }
            MigrationError::InvalidVersion(version) => {
                write!(f, "Invalid migration version: {}", version)
            }
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<SqlError> for MigrationError {
    fn from(error: SqlError) -> Self {
        MigrationError::Database(error)
    }
}

impl From<TransactionError> for MigrationError {
    fn from(error: TransactionError) -> Self {
        MigrationError::Database(error.into())
    }
}
