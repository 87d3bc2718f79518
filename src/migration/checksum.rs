//! Checksum calculation for embedded migrations

use super::MigrationError;
use sha2::{Digest, Sha256};

/// Calculate the hex SHA-256 of a migration's statements
///
/// Statements are joined with `;\n` so that moving text between two statements changes the
/// checksum.
pub fn calculate_checksum(statements: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, statement) in statements.iter().enumerate() {
        if i > 0 {
            hasher.update(b";\n");
        }
        hasher.update(statement.trim().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Compare the stored checksum of an applied migration with the embedded one
pub fn validate_checksum(
    version: i64,
    name: &str,
    stored: &str,
    current: &str,
) -> Result<(), MigrationError> {
    if stored == current {
        Ok(())
    } else {
        Err(MigrationError::ChecksumMismatch {
            version,
            name: name.to_string(),
            stored: stored.to_string(),
            current: current.to_string(),
        })
    }
}
