//! In-process migration on application startup

use super::{initialize_state_table, MigrationError, MigrationLockGuard, Migrator};
use crate::executor::SqlExecutor;

/// Run pending migrations during application initialization
///
/// Takes the table lock (so only one instance migrates), validates the checksums of
/// everything already applied, then applies what is pending. The application should not
/// start if this fails.
pub fn startup_migrations(
    executor: &dyn SqlExecutor,
    timeout_seconds: Option<u64>,
) -> Result<usize, MigrationError> {
    initialize_state_table(executor)?;
    let lock = MigrationLockGuard::acquire(executor, timeout_seconds)?;

    let applied = Migrator::default().up_with_lock(lock.executor(), None)?;
    if applied > 0 {
        log::info!("Applied {} migration(s) on startup", applied);
    } else {
        log::debug!("No pending migrations to apply");
    }

    Ok(applied)
}
