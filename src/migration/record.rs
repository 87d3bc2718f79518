//! `MigrationRecord` - entries in the `storefront_migrations` state table

use super::MigrationError;
use chrono::{DateTime, Utc};
use may_postgres::Row;

/// A row of the migration state table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Migration version (timestamp: YYYYMMDDHHMMSS)
    pub version: i64,

    /// Human-readable migration name
    pub name: String,

    /// `SHA-256` checksum of the migration's SQL
    pub checksum: String,

    /// When the migration was applied
    pub applied_at: DateTime<Utc>,

    /// Execution time in milliseconds (`None` if not recorded)
    pub execution_time_ms: Option<i64>,

    /// Whether the migration completed successfully
    pub success: bool,
}

impl MigrationRecord {
    #[must_use]
    pub fn new(
        version: i64,
        name: String,
        checksum: String,
        applied_at: DateTime<Utc>,
        execution_time_ms: Option<i64>,
        success: bool,
    ) -> Self {
        Self {
            version,
            name,
            checksum,
            applied_at,
            execution_time_ms,
            success,
        }
    }

    /// Decode a state-table row
    ///
    /// Expected column order: `version`, `name`, `checksum`, `applied_at`,
    /// `execution_time_ms`, `success`
    pub fn from_row(row: &Row) -> Result<Self, MigrationError> {
        let decode = |e: may_postgres::Error| {
            MigrationError::Database(crate::executor::SqlError::ParseError(format!(
                "migration record: {e}"
            )))
        };
        let execution_time_ms: Option<i32> = row.try_get(4).map_err(decode)?;
        Ok(Self {
            version: row.try_get(0).map_err(decode)?,
            name: row.try_get(1).map_err(decode)?,
            checksum: row.try_get(2).map_err(decode)?,
            applied_at: row.try_get(3).map_err(decode)?,
            execution_time_ms: execution_time_ms.map(i64::from),
            success: row.try_get(5).map_err(decode)?,
        })
    }
}
