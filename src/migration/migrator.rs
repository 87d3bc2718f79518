//! Migrator - applies embedded migrations and tracks them in the state table

use super::checksum::validate_checksum;
use super::schema::MIGRATIONS;
use super::{
    initialize_state_table, Migration, MigrationError, MigrationLockGuard, MigrationRecord,
    MigrationStatus, PendingMigration,
};
use crate::executor::SqlExecutor;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Instant;

/// Applies a fixed, version-ordered list of migrations
pub struct Migrator {
    migrations: &'static [Migration],
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new(MIGRATIONS)
    }
}

impl Migrator {
    pub fn new(migrations: &'static [Migration]) -> Self {
        Self { migrations }
    }

    pub fn migrations(&self) -> &'static [Migration] {
        self.migrations
    }

    fn check_order(&self) -> Result<(), MigrationError> {
        let mut previous = 0;
        for migration in self.migrations {
            if migration.version <= previous {
                return Err(MigrationError::InvalidVersion(migration.version));
            }
            previous = migration.version;
        }
        Ok(())
    }

    fn query_applied_migrations(
        executor: &dyn SqlExecutor,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        executor
            .query_all(
                "SELECT version, name, checksum, applied_at, execution_time_ms, success \
                 FROM storefront_migrations WHERE version > 0 ORDER BY version",
                &[],
            )?
            .iter()
            .map(MigrationRecord::from_row)
            .collect()
    }

    fn record_migration(
        executor: &dyn SqlExecutor,
        record: &MigrationRecord,
    ) -> Result<(), MigrationError> {
        let execution_time_ms = record
            .execution_time_ms
            .map(|ms| i32::try_from(ms).unwrap_or(i32::MAX));
        executor.execute(
            "INSERT INTO storefront_migrations \
             (version, name, checksum, applied_at, execution_time_ms, success) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &record.version,
                &record.name,
                &record.checksum,
                &record.applied_at,
                &execution_time_ms,
                &record.success,
            ],
        )?;
        Ok(())
    }

    /// Compare embedded migrations with the state table
    ///
    /// Fails on a checksum mismatch, or when the database has a migration applied that
    /// this build does not embed.
    pub fn status(&self, executor: &dyn SqlExecutor) -> Result<MigrationStatus, MigrationError> {
        self.check_order()?;
        initialize_state_table(executor)?;

        let applied = Self::query_applied_migrations(executor)?;
        let known: HashSet<i64> = self.migrations.iter().map(|m| m.version).collect();
        if let Some(unknown) = applied.iter().find(|r| !known.contains(&r.version)) {
            return Err(MigrationError::MissingMigration {
                version: unknown.version,
                name: unknown.name.clone(),
            });
        }

        let mut applied_records = Vec::new();
        let mut pending = Vec::new();
        for migration in self.migrations {
            let checksum = migration.checksum();
            match applied.iter().find(|r| r.version == migration.version) {
                Some(record) => {
                    validate_checksum(
                        migration.version,
                        migration.name,
                        &record.checksum,
                        &checksum,
                    )?;
                    applied_records.push(record.clone());
                }
                None => pending.push(PendingMigration {
                    version: migration.version,
                    name: migration.name.to_string(),
                    checksum,
                }),
            }
        }

        Ok(MigrationStatus::new(applied_records, pending))
    }

    /// Apply pending migrations; the caller must already hold the migration lock
    ///
    /// Each migration runs in its own transaction together with its state-table row, so a
    /// failing migration leaves neither partial DDL nor a record behind.
    pub fn up_with_lock(
        &self,
        executor: &dyn SqlExecutor,
        steps: Option<usize>,
    ) -> Result<usize, MigrationError> {
        let status = self.status(executor)?;
        let steps = steps.unwrap_or(status.pending.len());

        let mut applied_count = 0;
        for pending in status.pending.iter().take(steps) {
            let Some(migration) = self.migrations.iter().find(|m| m.version == pending.version)
            else {
                continue;
            };

            let start = Instant::now();
            let tx = executor.begin_unit()?;
            for statement in migration.statements {
                if let Err(e) = tx.execute(statement, &[]) {
                    if let Err(rollback_err) = tx.rollback() {
                        log::warn!("rollback of migration {} failed: {}", migration.name, rollback_err);
                    }
                    return Err(MigrationError::ExecutionFailed {
                        version: migration.version,
                        name: migration.name.to_string(),
                        error: e.to_string(),
                    });
                }
            }

            let record = MigrationRecord::new(
                migration.version,
                migration.name.to_string(),
                pending.checksum.clone(),
                Utc::now(),
                Some(start.elapsed().as_millis() as i64),
                true,
            );
            Self::record_migration(&tx, &record)?;
            tx.commit()?;

            log::info!(
                "applied migration {} ({}) in {}ms",
                migration.name,
                migration.version,
                start.elapsed().as_millis()
            );
            applied_count += 1;
        }

        Ok(applied_count)
    }

    /// Acquire the lock, then apply all pending migrations
    pub fn up(
        &self,
        executor: &dyn SqlExecutor,
        timeout_seconds: Option<u64>,
    ) -> Result<usize, MigrationError> {
        initialize_state_table(executor)?;
        let lock = MigrationLockGuard::acquire(executor, timeout_seconds)?;
        self.up_with_lock(lock.executor(), None)
    }
}
