use std::path::{Path, PathBuf};

use csv::ByteRecord;

use comptrack_core::Sku;
use comptrack_inventory::{Component, Quantity, StockStatus, StockThreshold, parse_quantity};

use super::r#trait::InventoryRepository;
use crate::error::StoreError;
use crate::record::{HeaderCheck, Outcome, RecordFile, Schema, text_field};

const NAME: usize = 0;
const SKU: usize = 1;
const QUANTITY: usize = 2;
const STATUS: usize = 3;

/// Inventory stored as `Item Name,SKU,Quantity,Status` rows.
#[derive(Debug, Clone)]
pub struct CsvInventoryRepository {
    file: RecordFile,
    threshold: StockThreshold,
}

impl CsvInventoryRepository {
    /// Open (creating if needed) the inventory file at `path`.
    ///
    /// A file whose first row is not exactly the expected header is repaired
    /// once, here: existing rows are kept verbatim under a fresh header.
    pub fn open(path: impl Into<PathBuf>, threshold: StockThreshold) -> Result<Self, StoreError> {
        let file = RecordFile::new(path);
        match file.ensure_header(&Schema::INVENTORY)? {
            HeaderCheck::Intact => {}
            HeaderCheck::Repaired { preserved_rows } => tracing::warn!(
                path = %file.path().display(),
                preserved_rows,
                "inventory header did not match; file rewritten with expected header"
            ),
        }
        tracing::info!(path = %file.path().display(), %threshold, "inventory store opened");
        Ok(Self { file, threshold })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn record_for(&self, component: &Component) -> ByteRecord {
        ByteRecord::from(component.restated(self.threshold).to_record().to_vec())
    }
}

impl InventoryRepository for CsvInventoryRepository {
    fn threshold(&self) -> StockThreshold {
        self.threshold
    }

    fn load(&self) -> Result<Vec<Component>, StoreError> {
        let snapshot = self.file.snapshot()?;
        let Some(cols) = snapshot.columns(&Schema::INVENTORY) else {
            tracing::warn!(
                path = %self.path().display(),
                "inventory header lacks expected fields; treating store as empty"
            );
            return Ok(Vec::new());
        };

        let mut components = Vec::with_capacity(snapshot.rows.len());
        for (idx, row) in snapshot.rows.iter().enumerate() {
            match decode(row, &cols) {
                Some(component) => components.push(component),
                None => tracing::warn!(
                    path = %self.path().display(),
                    row = idx + 2,
                    "skipping malformed inventory row"
                ),
            }
        }
        Ok(components)
    }

    fn add(&self, component: &Component) -> Result<(), StoreError> {
        self.file
            .append(&Schema::INVENTORY, &self.record_for(component))?;
        tracing::debug!(sku = %component.sku(), "component appended");
        Ok(())
    }

    fn remove(&self, sku: &Sku) -> Result<bool, StoreError> {
        self.file.transact(|snapshot| {
            let Some(cols) = snapshot.columns(&Schema::INVENTORY) else {
                return Outcome::Abort(false);
            };
            let before = snapshot.rows.len();
            snapshot
                .rows
                .retain(|row| row.get(cols[SKU]) != Some(sku.as_str().as_bytes()));
            if snapshot.rows.len() == before {
                Outcome::Abort(false)
            } else {
                Outcome::Commit(true)
            }
        })
    }

    fn update_quantity(&self, sku: &Sku, quantity: Quantity) -> Result<bool, StoreError> {
        let quantity_text = quantity.to_string();
        let status_text = self.threshold.classify(quantity).to_string();

        self.file.transact(|snapshot| {
            let Some(cols) = snapshot.columns(&Schema::INVENTORY) else {
                return Outcome::Abort(false);
            };
            let mut updated = false;
            for row in snapshot.rows.iter_mut() {
                if row.get(cols[SKU]) != Some(sku.as_str().as_bytes()) {
                    continue;
                }
                let edited = with_fields(
                    row,
                    &[
                        (cols[QUANTITY], quantity_text.as_bytes()),
                        (cols[STATUS], status_text.as_bytes()),
                    ],
                );
                row.set_record(edited);
                updated = true;
            }
            if updated {
                Outcome::Commit(true)
            } else {
                Outcome::Abort(false)
            }
        })
    }
}

fn decode(row: &ByteRecord, cols: &[usize]) -> Option<Component> {
    let name = text_field(row, cols[NAME])?;
    let sku: Sku = text_field(row, cols[SKU])?.parse().ok()?;
    let quantity = parse_quantity(text_field(row, cols[QUANTITY])?).ok()?;
    let status: StockStatus = text_field(row, cols[STATUS])?.parse().ok()?;
    Component::from_stored(name, sku, quantity, status).ok()
}

/// Copy of `row` with the given columns replaced. Short rows are padded.
fn with_fields(row: &ByteRecord, replacements: &[(usize, &[u8])]) -> ByteRecord {
    let width = replacements
        .iter()
        .map(|(idx, _)| idx + 1)
        .fold(row.len(), usize::max);

    let mut out = ByteRecord::with_capacity(row.as_slice().len(), width);
    for idx in 0..width {
        let field = replacements
            .iter()
            .find(|(at, _)| *at == idx)
            .map(|(_, value)| *value)
            .or_else(|| row.get(idx))
            .unwrap_or_default();
        out.push_field(field);
    }
    out
}
