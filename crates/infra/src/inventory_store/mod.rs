//! Component inventory persistence.
//!
//! The trait describes the repository contract; `file` is the flat-file
//! implementation backed by a single record file.

pub mod file;
pub mod r#trait;

pub use file::CsvInventoryRepository;
pub use r#trait::InventoryRepository;
