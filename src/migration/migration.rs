//! Migration definition

use super::checksum::calculate_checksum;

/// One forward-only schema change
///
/// `statements` run in order inside a single transaction. Each entry must be exactly one SQL
/// statement, since they are sent through the extended query protocol.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Timestamp version, `YYYYMMDDHHMMSS`
    pub version: i64,
    /// Human-readable identifier
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

impl Migration {
    /// SHA-256 over the migration's SQL, as stored in the state table
    pub fn checksum(&self) -> String {
        calculate_checksum(self.statements)
    }
}
