//! Table-based migration lock
//!
//! The lock is a row with the reserved version `-1` in the state table. Whoever inserts it
//! holds the lock; everyone else polls until it disappears or the timeout runs out.

use super::MigrationError;
use crate::executor::SqlExecutor;
use std::time::{Duration, Instant};

/// Reserved version number for the lock row; real migrations use positive timestamps
pub const LOCK_VERSION: i64 = -1;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STATEMENT_TIMEOUT_SECONDS: u64 = 5;

/// Holds the migration lock and releases it on drop
pub struct MigrationLockGuard<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> MigrationLockGuard<'a> {
    /// Acquire the lock, waiting up to `timeout_seconds` (default 60)
    pub fn acquire(
        executor: &'a dyn SqlExecutor,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, MigrationError> {
        acquire_migration_lock(
            executor,
            timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )?;
        Ok(Self { executor })
    }

    pub fn executor(&self) -> &'a dyn SqlExecutor {
        self.executor
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = release_migration_lock(self.executor) {
            log::warn!("failed to release migration lock: {}", e);
        }
    }
}

fn timeout_error(timeout_seconds: u64, detail: &str) -> MigrationError {
    MigrationError::LockTimeout(format!(
        "could not acquire the migration lock within {timeout_seconds} seconds{detail}. \
         If no other instance is migrating, remove the stale lock with: \
         DELETE FROM storefront_migrations WHERE version = {LOCK_VERSION}"
    ))
}

/// Insert the lock row, polling until it succeeds or `timeout_seconds` elapse
///
/// Sleeps with `may::coroutine::sleep`, so waiting inside a coroutine yields to the
/// scheduler instead of blocking the worker thread.
pub fn acquire_migration_lock(
    executor: &dyn SqlExecutor,
    timeout_seconds: u64,
) -> Result<(), MigrationError> {
    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_seconds);

    // Bound each attempt so a wedged statement cannot outlive the overall timeout.
    let set_timeout_sql = format!("SET statement_timeout = '{STATEMENT_TIMEOUT_SECONDS}s'");
    let _ = executor.execute(&set_timeout_sql, &[]);

    let insert_sql = format!(
        "INSERT INTO storefront_migrations (version, name, checksum, applied_at, success) \
         VALUES ({LOCK_VERSION}, 'LOCK', 'lock', NOW(), true) \
         ON CONFLICT (version) DO NOTHING"
    );

    let outcome = loop {
        if start.elapsed() >= timeout {
            break Err(timeout_error(timeout_seconds, ""));
        }

        match executor.execute(&insert_sql, &[]) {
            Ok(rows) if rows > 0 => break Ok(()),
            Ok(_) => {
                log::debug!("migration lock held elsewhere; waiting");
            }
            Err(e) => {
                let message = e.to_string();
                if !(message.contains("timeout") || message.contains("canceling statement")) {
                    break Err(MigrationError::Database(e));
                }
                if start.elapsed() >= timeout {
                    break Err(timeout_error(timeout_seconds, " (statement timed out)"));
                }
            }
        }
        may::coroutine::sleep(POLL_INTERVAL);
    };

    let _ = executor.execute("RESET statement_timeout", &[]);
    outcome
}

/// Delete the lock row
pub fn release_migration_lock(executor: &dyn SqlExecutor) -> Result<(), MigrationError> {
    executor.execute(
        &format!("DELETE FROM storefront_migrations WHERE version = {LOCK_VERSION}"),
        &[],
    )?;
    Ok(())
}

/// Whether some process currently holds the lock
pub fn is_migration_lock_held(executor: &dyn SqlExecutor) -> Result<bool, MigrationError> {
    let row = executor.query_one(
        &format!("SELECT COUNT(*) FROM storefront_migrations WHERE version = {LOCK_VERSION}"),
        &[],
    )?;
    let count: i64 = row.get(0);
    Ok(count > 0)
}
