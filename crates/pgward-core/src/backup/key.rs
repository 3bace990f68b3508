//! Timestamp keys identifying backup files.

use chrono::Utc;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid backup key {0:?}: expected a 14-digit UTC timestamp (YYYYMMDDHHMMSS)")]
pub struct InvalidKey(String);

/// Second-precision UTC timestamp naming one backup, e.g. `20260806143000`.
///
/// Keys are not interlocked: two backups started within the same second
/// resolve to the same file name and the second overwrites the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupKey(String);

impl BackupKey {
    /// Key for the current instant.
    pub fn now() -> Self {
        Self(Utc::now().format("%Y%m%d%H%M%S").to_string())
    }

    /// Parse a key supplied by an operator (restore/delete by key).
    pub fn parse(s: &str) -> Result<Self, InvalidKey> {
        if s.len() == 14 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidKey(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for this key in a given database: `<key>_<database>.sql`.
    pub fn file_name(&self, database: &str) -> String {
        format!("{}_{}.sql", self.0, database)
    }
}

impl fmt::Display for BackupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_fourteen_digits() {
        let key = BackupKey::now();
        assert_eq!(key.as_str().len(), 14);
        assert!(key.as_str().bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn parse_accepts_well_formed_keys() {
        let key = BackupKey::parse("20260806143000").unwrap();
        assert_eq!(key.as_str(), "20260806143000");
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!(BackupKey::parse("2026-08-06").is_err());
        assert!(BackupKey::parse("20260806ature!").is_err());
        assert!(BackupKey::parse("").is_err());
        assert!(BackupKey::parse("202608061430001").is_err());
    }

    #[test]
    fn file_name_combines_key_and_database() {
        let key = BackupKey::parse("20260806143000").unwrap();
        assert_eq!(key.file_name("catalog"), "20260806143000_catalog.sql");
    }
}
