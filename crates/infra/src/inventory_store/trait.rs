use std::sync::Arc;

use comptrack_core::Sku;
use comptrack_inventory::{Component, Quantity, StockThreshold};

use crate::error::StoreError;

/// Repository of tracked components.
///
/// ## Consistency
///
/// Every call reads storage afresh; nothing is cached between calls. Mutations
/// other than `add` are snapshot transactions (read all, transform, write all):
/// either the store reflects the whole change afterwards or it is unchanged.
///
/// ## Uniqueness
///
/// SKUs are unique across live components, but `add` does **not** check this.
/// Callers must confirm `exists(sku)` is false first; `Workshop::add_component`
/// does. Calling `add` for a tracked SKU writes a duplicate record.
///
/// ## Not found
///
/// `remove` and `update_quantity` report an unknown SKU as `Ok(false)`.
/// `Err` is reserved for storage failures.
pub trait InventoryRepository {
    /// Threshold used to derive the status of every record written.
    fn threshold(&self) -> StockThreshold;

    /// All decodable components in file order.
    ///
    /// Returns an empty list if the header lacks the expected fields.
    fn load(&self) -> Result<Vec<Component>, StoreError>;

    /// Whether a loaded component has `sku`. Always reflects storage.
    fn exists(&self, sku: &Sku) -> Result<bool, StoreError> {
        Ok(self.load()?.iter().any(|c| c.sku() == sku))
    }

    /// Append `component`, with its status re-derived from [`Self::threshold`].
    ///
    /// Precondition: `exists(component.sku())` is false.
    fn add(&self, component: &Component) -> Result<(), StoreError>;

    /// Drop every record with `sku`. True iff at least one was dropped.
    fn remove(&self, sku: &Sku) -> Result<bool, StoreError>;

    /// Set the quantity (and re-derive the status) of every record with
    /// `sku`, leaving all other records untouched. True iff one matched.
    fn update_quantity(&self, sku: &Sku, quantity: Quantity) -> Result<bool, StoreError>;
}

impl<R> InventoryRepository for Arc<R>
where
    R: InventoryRepository + ?Sized,
{
    fn threshold(&self) -> StockThreshold {
        (**self).threshold()
    }

    fn load(&self) -> Result<Vec<Component>, StoreError> {
        (**self).load()
    }

    fn exists(&self, sku: &Sku) -> Result<bool, StoreError> {
        (**self).exists(sku)
    }

    fn add(&self, component: &Component) -> Result<(), StoreError> {
        (**self).add(component)
    }

    fn remove(&self, sku: &Sku) -> Result<bool, StoreError> {
        (**self).remove(sku)
    }

    fn update_quantity(&self, sku: &Sku, quantity: Quantity) -> Result<bool, StoreError> {
        (**self).update_quantity(sku, quantity)
    }
}
