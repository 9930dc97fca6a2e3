//! Message consumers (inventory side).

pub mod catalog_item_added;

pub use catalog_item_added::{CatalogItemAddedConsumer, ConsumeError, ConsumeOutcome};
