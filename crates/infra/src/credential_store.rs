//! Username / password-digest store.

use std::path::{Path, PathBuf};

use csv::ByteRecord;

use comptrack_auth::{CredentialRecord, PasswordHash};

use crate::error::StoreError;
use crate::record::{RecordFile, Schema, text_field};

/// Login check against stored credentials.
///
/// No lockout or attempt counting: any number of attempts may be made.
pub trait CredentialStore {
    /// True iff a stored account has exactly `username` and the digest of
    /// `password`. A missing store is `Ok(false)`.
    fn validate(&self, username: &str, password: &str) -> Result<bool, StoreError>;
}

/// Credentials stored as `username,password_hash` rows.
#[derive(Debug, Clone)]
pub struct CsvCredentialStore {
    file: RecordFile,
}

impl CsvCredentialStore {
    /// Open the store, seeding a new file with the default account.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let file = RecordFile::new(path);
        let seed = CredentialRecord::seeded_default();
        let created = file.create_if_missing(
            &Schema::CREDENTIALS,
            &[ByteRecord::from(vec![
                seed.username.as_str(),
                seed.password_hash.as_str(),
            ])],
        )?;
        if created {
            tracing::warn!(
                path = %file.path().display(),
                username = %seed.username,
                "credential store created with the default account; replace it before real use"
            );
        }
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Every decodable account, in file order.
    pub fn records(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let snapshot = self.file.snapshot()?;
        let Some(cols) = snapshot.columns(&Schema::CREDENTIALS) else {
            return Ok(Vec::new());
        };
        Ok(snapshot
            .rows
            .iter()
            .filter_map(|row| {
                let username = text_field(row, cols[0])?;
                let password_hash = PasswordHash::from_hex(text_field(row, cols[1])?).ok()?;
                Some(CredentialRecord {
                    username: username.to_string(),
                    password_hash,
                })
            })
            .collect())
    }
}

impl CredentialStore for CsvCredentialStore {
    fn validate(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let records = match self.records() {
            Ok(records) => records,
            Err(err) if err.is_not_found() => {
                tracing::warn!(path = %self.path().display(), "credential store missing");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        Ok(records.iter().any(|r| r.matches(username, password)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn fresh_store_accepts_only_the_default_account() {
        let dir = tempdir().unwrap();
        let store = CsvCredentialStore::open(dir.path().join("users.csv")).unwrap();

        assert!(store.validate("test", "test123").unwrap());
        assert!(!store.validate("test", "wrong").unwrap());
        assert!(!store.validate("TEST", "test123").unwrap());
        assert!(!store.validate("admin", "test123").unwrap());
        assert!(!store.validate("", "").unwrap());
    }

    #[test]
    fn seeded_file_has_header_and_hex_digest() {
        let dir = tempdir().unwrap();
        let store = CsvCredentialStore::open(dir.path().join("users.csv")).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "username,password_hash");
        assert_eq!(
            lines[1],
            format!("test,{}", PasswordHash::digest("test123").as_str())
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn reopening_does_not_reseed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let other = PasswordHash::digest("s3cret");
        fs::write(&path, format!("username,password_hash\nalice,{}\n", other.as_str())).unwrap();

        let store = CsvCredentialStore::open(&path).unwrap();
        assert!(store.validate("alice", "s3cret").unwrap());
        assert!(!store.validate("test", "test123").unwrap());
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_a_failed_login_not_an_error() {
        let dir = tempdir().unwrap();
        let store = CsvCredentialStore::open(dir.path().join("users.csv")).unwrap();
        fs::remove_file(store.path()).unwrap();

        assert!(!store.validate("test", "test123").unwrap());
    }

    #[test]
    fn malformed_digests_never_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.csv");
        fs::write(&path, "username,password_hash\nbob,test123\n").unwrap();

        let store = CsvCredentialStore::open(&path).unwrap();
        assert!(!store.validate("bob", "test123").unwrap());
        assert!(store.records().unwrap().is_empty());
    }
}
