//! `videopalace-core`: domain foundation building blocks shared by the
//! catalog and inventory services.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CatalogItemId, InventoryRecordId};
