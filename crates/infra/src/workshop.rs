//! Session-level orchestration over the three stores.
//!
//! `Workshop` is what an interactive front end drives: it validates raw form
//! input, enforces SKU uniqueness before appending, performs the repository
//! operation and records the outcome in the audit trail.
//!
//! ```text
//! raw input
//!   ↓
//! 1. Trim + validate (no storage touched on failure)
//!   ↓
//! 2. Repository operation (append or snapshot transaction)
//!   ↓
//! 3. Audit append (only for operations that changed something)
//! ```
//!
//! Presentation concerns (messages, tables, windows) stay with the caller;
//! every method returns plain data or a [`WorkshopError`].

use comptrack_audit::{AuditAction, AuditEntry};
use comptrack_core::{DomainError, Sku};
use comptrack_inventory::{Component, Quantity, StockThreshold, parse_quantity};

use crate::audit_log::{AuditLog, CsvAuditLog};
use crate::config::StoreConfig;
use crate::credential_store::{CredentialStore, CsvCredentialStore};
use crate::error::WorkshopError;
use crate::inventory_store::{CsvInventoryRepository, InventoryRepository};

/// The three stores behind one interactive session.
#[derive(Debug, Clone)]
pub struct Workshop<I, C, A> {
    inventory: I,
    credentials: C,
    audit: A,
}

/// Workshop over the flat-file stores.
pub type FileWorkshop = Workshop<CsvInventoryRepository, CsvCredentialStore, CsvAuditLog>;

impl FileWorkshop {
    /// Open (and initialise where needed) every store named by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, WorkshopError> {
        let credentials = CsvCredentialStore::open(config.credentials_path())?;
        let audit = CsvAuditLog::open(config.audit_path())?;
        let inventory =
            CsvInventoryRepository::open(config.inventory_path(), config.stock_threshold)?;
        Ok(Self::new(inventory, credentials, audit))
    }
}

impl<I, C, A> Workshop<I, C, A>
where
    I: InventoryRepository,
    C: CredentialStore,
    A: AuditLog,
{
    pub fn new(inventory: I, credentials: C, audit: A) -> Self {
        Self {
            inventory,
            credentials,
            audit,
        }
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    pub fn threshold(&self) -> StockThreshold {
        self.inventory.threshold()
    }

    /// Check a login attempt and record its outcome.
    pub fn login(&self, username: &str, password: &str) -> Result<bool, WorkshopError> {
        let username = username.trim();
        let ok = self.credentials.validate(username, password.trim())?;
        let action = if ok {
            AuditAction::LoginSucceeded
        } else {
            AuditAction::LoginFailed
        };
        self.audit.append(action, None)?;
        tracing::info!(username, success = ok, "login attempt");
        Ok(ok)
    }

    /// Track a new component.
    ///
    /// Every field is required, SKU and quantity must be positive integers,
    /// and the SKU must not already be tracked.
    pub fn add_component(
        &self,
        name: &str,
        sku: &str,
        quantity: &str,
    ) -> Result<Component, WorkshopError> {
        let (name, sku, quantity) = (name.trim(), sku.trim(), quantity.trim());
        if name.is_empty() || sku.is_empty() || quantity.is_empty() {
            return Err(DomainError::validation("all fields required").into());
        }
        let sku = parse_sku(sku)?;
        let quantity = parse_positive_quantity(quantity)?;

        if self.inventory.exists(&sku)? {
            return Err(DomainError::conflict(format!("item {sku} already exists")).into());
        }

        let component = Component::new(name, sku, quantity, self.threshold())?;
        self.inventory.add(&component)?;
        self.audit.append(AuditAction::ItemAdded, Some(component.sku()))?;
        Ok(component)
    }

    /// Stop tracking `sku`. False if it was not tracked.
    pub fn remove_component(&self, sku: &str) -> Result<bool, WorkshopError> {
        let sku = required_sku(sku)?;
        let removed = self.inventory.remove(&sku)?;
        if removed {
            self.audit.append(AuditAction::ItemRemoved, Some(&sku))?;
        }
        Ok(removed)
    }

    /// Set the quantity on hand for `sku`. False if it was not tracked.
    pub fn update_quantity(&self, sku: &str, quantity: &str) -> Result<bool, WorkshopError> {
        let (sku, quantity) = (sku.trim(), quantity.trim());
        if sku.is_empty() || quantity.is_empty() {
            return Err(DomainError::validation("SKU and quantity required").into());
        }
        let sku = parse_sku(sku)?;
        let quantity = parse_positive_quantity(quantity)?;

        let updated = self.inventory.update_quantity(&sku, quantity)?;
        if updated {
            self.audit.append(AuditAction::QuantityUpdated, Some(&sku))?;
        }
        Ok(updated)
    }

    /// Components with exactly `sku`, in file order. Empty if none.
    pub fn search(&self, sku: &str) -> Result<Vec<Component>, WorkshopError> {
        let sku = required_sku(sku)?;
        Ok(self
            .inventory
            .load()?
            .into_iter()
            .filter(|c| c.sku() == &sku)
            .collect())
    }

    pub fn components(&self) -> Result<Vec<Component>, WorkshopError> {
        Ok(self.inventory.load()?)
    }

    /// Components at or below the stock threshold.
    pub fn low_stock(&self) -> Result<Vec<Component>, WorkshopError> {
        let threshold = self.threshold();
        Ok(self
            .inventory
            .load()?
            .into_iter()
            .filter(|c| c.is_low_stock(threshold))
            .collect())
    }

    pub fn history(&self) -> Result<Vec<AuditEntry>, WorkshopError> {
        Ok(self.audit.replay()?)
    }
}

fn required_sku(sku: &str) -> Result<Sku, WorkshopError> {
    let sku = sku.trim();
    if sku.is_empty() {
        return Err(DomainError::validation("SKU required").into());
    }
    parse_sku(sku)
}

fn parse_sku(sku: &str) -> Result<Sku, WorkshopError> {
    sku.parse::<Sku>()
        .map_err(|_| DomainError::validation("SKU must be a positive number").into())
}

fn parse_positive_quantity(quantity: &str) -> Result<Quantity, WorkshopError> {
    match parse_quantity(quantity) {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(DomainError::validation("quantity must be a positive number").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comptrack_inventory::StockStatus;
    use tempfile::{TempDir, tempdir};

    fn workshop() -> (TempDir, FileWorkshop) {
        let dir = tempdir().unwrap();
        let ws = FileWorkshop::open(&StoreConfig::in_dir(dir.path())).unwrap();
        (dir, ws)
    }

    fn actions(ws: &FileWorkshop) -> Vec<AuditAction> {
        ws.history().unwrap().into_iter().map(|e| e.action).collect()
    }

    #[test]
    fn login_records_success_and_failure() {
        let (_dir, ws) = workshop();

        assert!(ws.login(" test ", "test123 ").unwrap());
        assert!(!ws.login("test", "nope").unwrap());

        assert_eq!(
            actions(&ws),
            vec![AuditAction::LoginSucceeded, AuditAction::LoginFailed]
        );
        assert!(ws.history().unwrap().iter().all(|e| e.sku.is_none()));
    }

    #[test]
    fn add_validates_before_touching_storage() {
        let (_dir, ws) = workshop();

        for (name, sku, qty) in [
            ("", "1", "5"),
            ("Cap", "", "5"),
            ("Cap", "1", ""),
            ("Cap", "abc", "5"),
            ("Cap", "0", "5"),
            ("Cap", "-3", "5"),
            ("Cap", "1", "0"),
            ("Cap", "1", "-1"),
            ("Cap", "1", "1.5"),
        ] {
            assert!(
                matches!(ws.add_component(name, sku, qty), Err(WorkshopError::Validation(_))),
                "expected validation error for {name:?}/{sku:?}/{qty:?}"
            );
        }
        assert!(ws.components().unwrap().is_empty());
        assert!(ws.history().unwrap().is_empty());
    }

    #[test]
    fn add_rejects_duplicate_sku() {
        let (_dir, ws) = workshop();

        let added = ws.add_component(" Resistor ", "100", "3").unwrap();
        assert_eq!(added.name(), "Resistor");
        assert_eq!(added.status(), StockStatus::LowStock);

        assert!(matches!(
            ws.add_component("Other", "100", "9"),
            Err(WorkshopError::Conflict(_))
        ));
        assert_eq!(ws.components().unwrap().len(), 1);
        assert_eq!(actions(&ws), vec![AuditAction::ItemAdded]);
    }

    #[test]
    fn remove_and_update_log_only_when_something_changed() {
        let (_dir, ws) = workshop();
        ws.add_component("LED", "7", "40").unwrap();

        assert!(!ws.remove_component("8").unwrap());
        assert!(!ws.update_quantity("8", "3").unwrap());
        assert!(ws.update_quantity("7", "3").unwrap());
        assert!(ws.remove_component("7").unwrap());

        assert_eq!(
            actions(&ws),
            vec![
                AuditAction::ItemAdded,
                AuditAction::QuantityUpdated,
                AuditAction::ItemRemoved
            ]
        );
        let history = ws.history().unwrap();
        assert!(history.iter().all(|e| e.sku.as_deref() == Some("7")));
    }

    #[test]
    fn update_rejects_non_positive_quantity() {
        let (_dir, ws) = workshop();
        ws.add_component("LED", "7", "40").unwrap();

        assert!(matches!(ws.update_quantity("7", "0"), Err(WorkshopError::Validation(_))));
        assert!(matches!(ws.update_quantity("", "4"), Err(WorkshopError::Validation(_))));
        assert_eq!(ws.components().unwrap()[0].quantity(), 40);
    }

    #[test]
    fn search_and_low_stock_filter_loaded_components() {
        let (_dir, ws) = workshop();
        ws.add_component("Resistor", "100", "3").unwrap();
        ws.add_component("Capacitor", "200", "30").unwrap();

        let found = ws.search(" 200 ").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "Capacitor");
        assert!(ws.search("300").unwrap().is_empty());
        assert!(matches!(ws.search(""), Err(WorkshopError::Validation(_))));

        let low = ws.low_stock().unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sku().as_str(), "100");
    }

    #[test]
    fn custom_threshold_drives_status() {
        let dir = tempdir().unwrap();
        let config = StoreConfig {
            stock_threshold: StockThreshold::new(50),
            ..StoreConfig::in_dir(dir.path())
        };
        let ws = FileWorkshop::open(&config).unwrap();

        let c = ws.add_component("Diode", "5", "30").unwrap();
        assert_eq!(c.status(), StockStatus::LowStock);
        assert!(ws.update_quantity("5", "51").unwrap());
        assert_eq!(ws.components().unwrap()[0].status(), StockStatus::SufficientStock);
    }

    #[test]
    fn shared_repository_sees_workshop_writes() {
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let config = StoreConfig::in_dir(dir.path());
        let repo = Arc::new(
            CsvInventoryRepository::open(config.inventory_path(), config.stock_threshold).unwrap(),
        );
        let ws = Workshop::new(
            Arc::clone(&repo),
            CsvCredentialStore::open(config.credentials_path()).unwrap(),
            CsvAuditLog::open(config.audit_path()).unwrap(),
        );

        ws.add_component("Relay", "31", "2").unwrap();
        assert!(repo.exists(&"31".parse().unwrap()).unwrap());
        assert_eq!(ws.inventory().load().unwrap().len(), 1);
    }
}
