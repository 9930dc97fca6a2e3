//! Catalog → inventory synchronization.
//!
//! The catalog write path hands every persisted item to a [`SynchronizationDispatcher`].
//! Two strategies exist, picked once at composition time:
//!
//! - [`EventPublisher`]: publishes a `CatalogItemAdded` event to the broker; the inventory
//!   service materializes the record asynchronously (eventual consistency).
//! - [`InventoryClient`]: calls the inventory service's direct-create endpoint and
//!   reports the remote outcome synchronously.

pub mod event_publisher;
pub mod inventory_client;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use videopalace_catalog::CatalogItem;

pub use event_publisher::EventPublisher;
pub use inventory_client::InventoryClient;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The broker did not accept the event within the retry budget.
    #[error("event delivery failed: {0}")]
    Delivery(String),

    /// The remote inventory service failed or was unreachable (`status` is `None`
    /// when no HTTP response was received).
    #[error("remote call failed (status {status:?}): {message}")]
    Remote { status: Option<u16>, message: String },
}

/// Propagates catalog items to the inventory side.
#[async_trait]
pub trait SynchronizationDispatcher: Send + Sync {
    /// Short name for logs (`events` / `direct`).
    fn strategy(&self) -> &'static str;

    async fn propagate(&self, item: &CatalogItem) -> Result<(), SyncError>;

    /// Propagate a batch, one item at a time, in order. Batch-level semantics are
    /// strategy specific.
    async fn propagate_all(&self, items: &[CatalogItem]) -> Result<(), SyncError>;
}

#[async_trait]
impl<D> SynchronizationDispatcher for Arc<D>
where
    D: SynchronizationDispatcher + ?Sized,
{
    fn strategy(&self) -> &'static str {
        (**self).strategy()
    }

    async fn propagate(&self, item: &CatalogItem) -> Result<(), SyncError> {
        (**self).propagate(item).await
    }

    async fn propagate_all(&self, items: &[CatalogItem]) -> Result<(), SyncError> {
        (**self).propagate_all(items).await
    }
}
