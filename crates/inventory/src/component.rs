use core::str::FromStr;

use serde::{Deserialize, Serialize};

use comptrack_core::{DomainError, DomainResult, Sku, ValueObject};

/// Units on hand. Never negative.
pub type Quantity = u32;

/// Quantity at or below which a component is flagged [`StockStatus::LowStock`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockThreshold(Quantity);

impl StockThreshold {
    pub const DEFAULT: StockThreshold = StockThreshold(5);

    pub const fn new(value: Quantity) -> Self {
        Self(value)
    }

    pub const fn get(self) -> Quantity {
        self.0
    }

    /// Derive the stock status of `quantity` under this threshold.
    pub fn classify(self, quantity: Quantity) -> StockStatus {
        if quantity <= self.0 {
            StockStatus::LowStock
        } else {
            StockStatus::SufficientStock
        }
    }
}

impl Default for StockThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl core::fmt::Display for StockThreshold {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "Sufficient Stock")]
    SufficientStock,
    #[serde(rename = "Low Stock")]
    LowStock,
}

impl StockStatus {
    /// Literal text written to the inventory file.
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::SufficientStock => "Sufficient Stock",
            StockStatus::LowStock => "Low Stock",
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sufficient Stock" => Ok(StockStatus::SufficientStock),
            "Low Stock" => Ok(StockStatus::LowStock),
            other => Err(DomainError::validation(format!(
                "unknown stock status '{other}'"
            ))),
        }
    }
}

/// A tracked part: one row of the inventory.
///
/// `status` reflects the threshold in force when the record was last
/// written; stores recompute it on every write rather than trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    name: String,
    sku: Sku,
    quantity: Quantity,
    status: StockStatus,
}

impl ValueObject for Component {}

impl Component {
    /// Build a component, deriving its status from `threshold`.
    pub fn new(
        name: impl Into<String>,
        sku: Sku,
        quantity: Quantity,
        threshold: StockThreshold,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            name,
            sku,
            quantity,
            status: threshold.classify(quantity),
        })
    }

    /// Build a component from external text (form input, file fields).
    pub fn parse(
        name: &str,
        sku: &str,
        quantity: &str,
        threshold: StockThreshold,
    ) -> DomainResult<Self> {
        let sku: Sku = sku.parse()?;
        let quantity = parse_quantity(quantity)?;
        Self::new(name, sku, quantity, threshold)
    }

    /// Rebuild a component exactly as it was persisted, status included.
    pub fn from_stored(
        name: impl Into<String>,
        sku: Sku,
        quantity: Quantity,
        status: StockStatus,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            name,
            sku,
            quantity,
            status,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn is_low_stock(&self, threshold: StockThreshold) -> bool {
        threshold.classify(self.quantity) == StockStatus::LowStock
    }

    /// Same component with a new quantity and a freshly derived status.
    pub fn with_quantity(&self, quantity: Quantity, threshold: StockThreshold) -> Self {
        Self {
            name: self.name.clone(),
            sku: self.sku.clone(),
            quantity,
            status: threshold.classify(quantity),
        }
    }

    /// Same component with its status re-derived under `threshold`.
    pub fn restated(&self, threshold: StockThreshold) -> Self {
        self.with_quantity(self.quantity, threshold)
    }

    /// The four columns in inventory file order: name, SKU, quantity, status.
    pub fn to_record(&self) -> [String; 4] {
        [
            self.name.clone(),
            self.sku.to_string(),
            self.quantity.to_string(),
            self.status.to_string(),
        ]
    }
}

/// Parse a non-negative decimal quantity.
pub fn parse_quantity(text: &str) -> DomainResult<Quantity> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::validation(format!(
            "quantity '{text}' is not a non-negative number"
        )));
    }
    text.parse::<Quantity>()
        .map_err(|e| DomainError::validation(format!("quantity '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sku(s: &str) -> Sku {
        s.parse().unwrap()
    }

    #[test]
    fn status_is_derived_from_threshold_on_construction() {
        let low = Component::new("Resistor", sku("100"), 3, StockThreshold::DEFAULT).unwrap();
        assert_eq!(low.status(), StockStatus::LowStock);
        assert!(low.is_low_stock(StockThreshold::DEFAULT));

        let edge = Component::new("Resistor", sku("100"), 5, StockThreshold::DEFAULT).unwrap();
        assert_eq!(edge.status(), StockStatus::LowStock);

        let plenty = Component::new("Resistor", sku("100"), 6, StockThreshold::DEFAULT).unwrap();
        assert_eq!(plenty.status(), StockStatus::SufficientStock);
        assert!(!plenty.is_low_stock(StockThreshold::DEFAULT));
    }

    #[test]
    fn parse_rejects_bad_text() {
        let t = StockThreshold::DEFAULT;
        assert!(matches!(
            Component::parse("", "1", "3", t),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Component::parse("Cap", "abc", "3", t),
            Err(DomainError::InvalidId(_))
        ));
        assert!(matches!(
            Component::parse("Cap", "1", "-3", t),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Component::parse("Cap", "1", "three", t),
            Err(DomainError::Validation(_))
        ));
        assert!(Component::parse("Cap", "1", "0", t).is_ok());
    }

    #[test]
    fn with_quantity_recomputes_status() {
        let t = StockThreshold::new(10);
        let c = Component::parse("LED", "42", "50", t).unwrap();
        assert_eq!(c.status(), StockStatus::SufficientStock);

        let c = c.with_quantity(10, t);
        assert_eq!(c.quantity(), 10);
        assert_eq!(c.status(), StockStatus::LowStock);
        assert_eq!(c.name(), "LED");
        assert_eq!(c.sku().as_str(), "42");
    }

    #[test]
    fn stored_status_is_kept_until_restated() {
        let c = Component::from_stored("LED", sku("42"), 2, StockStatus::SufficientStock).unwrap();
        assert_eq!(c.status(), StockStatus::SufficientStock);
        assert_eq!(c.restated(StockThreshold::DEFAULT).status(), StockStatus::LowStock);
    }

    #[test]
    fn record_columns_are_in_file_order() {
        let c = Component::parse("Resistor", "100", "3", StockThreshold::DEFAULT).unwrap();
        assert_eq!(c.to_record(), ["Resistor", "100", "3", "Low Stock"].map(String::from));
    }

    #[test]
    fn status_text_round_trips() {
        for s in [StockStatus::LowStock, StockStatus::SufficientStock] {
            assert_eq!(s.as_str().parse::<StockStatus>().unwrap(), s);
        }
        assert!("low stock".parse::<StockStatus>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: status is LowStock iff quantity <= threshold.
        #[test]
        fn classification_matches_threshold(quantity in 0u32..10_000, threshold in 0u32..10_000) {
            let t = StockThreshold::new(threshold);
            let c = Component::new("Part", "1".parse().unwrap(), quantity, t).unwrap();
            prop_assert_eq!(c.is_low_stock(t), quantity <= threshold);
            prop_assert_eq!(c.status() == StockStatus::LowStock, quantity <= threshold);
        }
    }
}
