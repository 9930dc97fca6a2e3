//! Inventory domain module.
//!
//! Inventory records track how many copies of a catalog item exist and how many
//! are available for loan. They are derived from catalog items and owned by the
//! inventory service (no IO, no HTTP, no storage here).

pub mod record;

pub use record::{InventoryRecord, NewInventoryRecord, UNITS_PER_CATALOG_ITEM};
