//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two instances with the same attribute
/// values are the same value. In this workspace a `Component` is compared by
/// its full record (name, SKU, quantity, status), and thresholds, hashes and
/// audit entries behave the same way.
///
/// To "modify" a value object, build a new one (e.g. `Component::with_quantity`).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
