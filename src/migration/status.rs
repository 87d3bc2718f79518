//! Migration status tracking

use super::MigrationRecord;

/// Applied versus pending migrations
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Applied migrations (from the state table)
    pub applied: Vec<MigrationRecord>,

    /// Embedded migrations not yet applied, in version order
    pub pending: Vec<PendingMigration>,
}

/// An embedded migration that has not been applied yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<MigrationRecord>, pending: Vec<PendingMigration>) -> Self {
        Self { applied, pending }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn latest_applied_version(&self) -> Option<i64> {
        self.applied.iter().map(|m| m.version).max()
    }

    #[must_use]
    pub fn next_pending_version(&self) -> Option<i64> {
        self.pending.first().map(|m| m.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_status_summaries() {
        let applied = vec![MigrationRecord::new(
            20240301000000,
            "create_users".into(),
            "abc".into(),
            Utc::now(),
            Some(4),
            true,
        )];
        let pending = vec![PendingMigration {
            version: 20240301000100,
            name: "create_categories".into(),
            checksum: "def".into(),
        }];
        let status = MigrationStatus::new(applied, pending);
        assert!(!status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), Some(20240301000000));
        assert_eq!(status.next_pending_version(), Some(20240301000100));
    }
}
