//! Inventory domain module.
//!
//! This crate contains business rules for tracked components, implemented
//! purely as deterministic domain logic (no IO, no storage).

pub mod component;

pub use component::{Component, Quantity, StockStatus, StockThreshold, parse_quantity};
