//! Append-only audit trail.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use csv::ByteRecord;

use comptrack_audit::{AuditAction, AuditEntry};
use comptrack_core::Sku;

use crate::error::StoreError;
use crate::record::{RecordFile, Schema, text_field};

/// Timestamped record of every mutating action.
pub trait AuditLog {
    /// Record `action` now. `None` means the event has no SKU.
    ///
    /// The entry is durably written before this returns; failures are errors.
    fn append(&self, action: AuditAction, sku: Option<&Sku>) -> Result<AuditEntry, StoreError>;

    /// Every entry, oldest first, with non-decreasing timestamps. A log that
    /// was never started is empty.
    fn replay(&self) -> Result<Vec<AuditEntry>, StoreError>;
}

/// Audit trail stored as `Timestamp,Action,SKU` rows.
///
/// Timestamps come from the wall clock but never go backwards within the
/// log: an entry stamped earlier than the newest one already written takes
/// that newest timestamp instead.
#[derive(Debug, Clone)]
pub struct CsvAuditLog {
    file: RecordFile,
    latest: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl CsvAuditLog {
    /// Open the log, creating it with its header if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let file = RecordFile::new(path);
        file.create_if_missing(&Schema::AUDIT, &[])?;
        let log = Self {
            file,
            latest: Arc::new(Mutex::new(None)),
        };
        let latest = log.replay()?.into_iter().map(|e| e.timestamp).max();
        *log.lock_latest() = latest;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Record `action` as of `timestamp`, clamped to the newest entry so far.
    pub fn append_at(
        &self,
        timestamp: DateTime<Utc>,
        action: AuditAction,
        sku: Option<&Sku>,
    ) -> Result<AuditEntry, StoreError> {
        let mut latest = self.lock_latest();
        let timestamp = match *latest {
            Some(prev) if prev > timestamp => prev,
            _ => timestamp,
        };
        let entry = AuditEntry::new(timestamp, action, sku);
        self.file
            .append(&Schema::AUDIT, &ByteRecord::from(entry.to_record().to_vec()))?;
        *latest = Some(entry.timestamp);
        tracing::debug!(action = %entry.action, sku = entry.sku_text(), "audit entry appended");
        Ok(entry)
    }

    fn lock_latest(&self) -> std::sync::MutexGuard<'_, Option<DateTime<Utc>>> {
        // The guarded value is a plain timestamp; a panicked holder can't leave it torn.
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditLog for CsvAuditLog {
    fn append(&self, action: AuditAction, sku: Option<&Sku>) -> Result<AuditEntry, StoreError> {
        self.append_at(Utc::now(), action, sku)
    }

    fn replay(&self) -> Result<Vec<AuditEntry>, StoreError> {
        let snapshot = match self.file.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let Some(cols) = snapshot.columns(&Schema::AUDIT) else {
            tracing::warn!(
                path = %self.path().display(),
                "audit log header lacks expected fields; nothing to replay"
            );
            return Ok(Vec::new());
        };

        let mut entries = Vec::with_capacity(snapshot.rows.len());
        for (idx, row) in snapshot.rows.iter().enumerate() {
            match decode(row, &cols) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(
                    path = %self.path().display(),
                    row = idx + 2,
                    "skipping malformed audit row"
                ),
            }
        }
        Ok(entries)
    }
}

fn decode(row: &ByteRecord, cols: &[usize]) -> Option<AuditEntry> {
    let timestamp = text_field(row, cols[0])?;
    let action = text_field(row, cols[1])?;
    let sku = text_field(row, cols[2])?;
    AuditEntry::from_columns(timestamp, action, sku).ok()
}
