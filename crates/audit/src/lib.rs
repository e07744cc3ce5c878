//! Audit trail events.
//!
//! Entries are:
//! - **immutable** (treat them as facts)
//! - **append-only** (never edited or deleted once written)
//! - ordered by the time they were recorded

pub mod entry;

pub use entry::{AuditAction, AuditEntry, NOT_APPLICABLE};
