//! Migration state table management

use crate::executor::{SqlError, SqlExecutor};

/// Name of the table tracking applied migrations (and holding the lock row)
pub const STATE_TABLE: &str = "storefront_migrations";

/// Create the `storefront_migrations` state table and its index if missing
///
/// Stores, per applied migration: version, name, SHA-256 checksum, applied timestamp,
/// execution time and success flag.
pub fn initialize_state_table(executor: &dyn SqlExecutor) -> Result<(), SqlError> {
    executor.execute(
        r#"
        CREATE TABLE IF NOT EXISTS storefront_migrations (
            version BIGINT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            checksum VARCHAR(64) NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL,
            execution_time_ms INTEGER,
            success BOOLEAN NOT NULL DEFAULT true
        )
        "#,
        &[],
    )?;

    executor.execute(
        r#"
        CREATE INDEX IF NOT EXISTS idx_storefront_migrations_applied_at
        ON storefront_migrations(applied_at)
        "#,
        &[],
    )?;

    Ok(())
}
