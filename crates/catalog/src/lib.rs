//! Catalog domain module.
//!
//! Catalog items are the authoritative description of a work (e.g. a film). This
//! crate holds the type and its input validation only (no IO, no HTTP, no storage).

pub mod item;

pub use item::{CatalogItem, NewCatalogItem};
