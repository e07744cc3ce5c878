use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use comptrack_core::{DomainError, DomainResult, ValueObject};

/// Username of the account seeded into a fresh credential store.
pub const DEFAULT_USERNAME: &str = "test";

/// Plaintext password of the seeded account.
///
/// Never rotated by this crate. Operators are expected to replace the
/// credential file before the store is exposed to real users.
pub const DEFAULT_PASSWORD: &str = "test123";

/// One-way digest of a password: SHA-256, lowercase hex.
///
/// Unsalted, so equal passwords hash equally across accounts.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl ValueObject for PasswordHash {}

impl PasswordHash {
    pub fn digest(password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Accept a digest read from storage. Must be 64 lowercase hex chars.
    pub fn from_hex(hex: &str) -> DomainResult<Self> {
        let valid = hex.len() == 64
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(DomainError::validation("password hash is not lowercase sha256 hex"));
        }
        Ok(Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, password: &str) -> bool {
        *self == Self::digest(password)
    }
}

// Keep digests out of logs and panic messages.
impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// A stored account: exact, case-sensitive username plus password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: PasswordHash,
}

impl ValueObject for CredentialRecord {}

impl CredentialRecord {
    /// The account a fresh store is seeded with.
    pub fn seeded_default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password_hash: PasswordHash::digest(DEFAULT_PASSWORD),
        }
    }

    /// Exact username match and matching digest.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password_hash.verify(password)
    }
}
