//! Infrastructure layer: backing files, stores, config, session orchestration.

pub mod audit_log;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod inventory_store;
pub mod record;
pub mod workshop;


pub use audit_log::{AuditLog, CsvAuditLog};
pub use config::StoreConfig;
pub use credential_store::{CredentialStore, CsvCredentialStore};
pub use error::{ConfigError, StoreError, WorkshopError};
pub use inventory_store::{CsvInventoryRepository, InventoryRepository};
pub use workshop::{FileWorkshop, Workshop};
