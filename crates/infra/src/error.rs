//! Storage and application error types.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use comptrack_core::DomainError;

/// Backing-file failure.
///
/// These are **infrastructure errors** (unreadable, unwritable, undecodable
/// files) as opposed to domain errors (validation, conflicts). They always
/// carry the path of the file involved.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("record format error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            StoreError::Io { path, .. } | StoreError::Csv { path, .. } => path,
        }
    }

    /// The backing file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            StoreError::Csv { source, .. } => {
                matches!(
                    source.kind(),
                    csv::ErrorKind::Io(e) if e.kind() == io::ErrorKind::NotFound
                )
            }
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidThreshold { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    EmptyPath { var: &'static str },
}

/// Application-level error returned by [`crate::Workshop`].
///
/// Maps domain errors and store errors into one enum, the way a caller
/// (a form, a CLI, a test) wants to branch on them.
#[derive(Debug, Error)]
pub enum WorkshopError {
    /// Input rejected before touching storage.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The SKU is already tracked.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for WorkshopError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => WorkshopError::Validation(msg),
            DomainError::InvalidId(msg) => WorkshopError::Validation(msg),
            DomainError::Conflict(msg) => WorkshopError::Conflict(msg),
        }
    }
}
