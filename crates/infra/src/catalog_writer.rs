//! Catalog write path: persist a catalog item, then hand it to the active
//! synchronization strategy.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use videopalace_catalog::{CatalogItem, NewCatalogItem};
use videopalace_core::{CatalogItemId, DomainError};

use crate::store::{EntityStore, StoreError};
use crate::sync::{SyncError, SynchronizationDispatcher};

#[derive(Debug, Error)]
pub enum CatalogWriteError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The item was persisted but could not be propagated. There is no rollback;
    /// `item` is the persisted item.
    #[error("catalog item {} was saved but not synchronized: {source}", .item.id)]
    Synchronization {
        item: Box<CatalogItem>,
        #[source]
        source: SyncError,
    },
}

/// Catalog-side writer (and reader) over a catalog store and a dispatcher.
#[derive(Debug, Clone)]
pub struct CatalogWriter<S, D> {
    store: S,
    dispatcher: D,
}

impl<S, D> CatalogWriter<S, D>
where
    S: EntityStore<CatalogItem>,
    D: SynchronizationDispatcher,
{
    pub fn new(store: S, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }

    /// Create a catalog item and propagate it.
    ///
    /// A broker delivery failure is logged and the write still succeeds (inventory
    /// may never appear for this item). A failed direct call is reported as
    /// [`CatalogWriteError::Synchronization`].
    #[instrument(skip(self, input), fields(strategy = self.dispatcher.strategy(), title = %input.title), err)]
    pub async fn add_item(&self, input: NewCatalogItem) -> Result<CatalogItem, CatalogWriteError> {
        let item = CatalogItem::create(input, Utc::now())?;
        self.store.create(item.clone()).await?;
        info!(item_id = %item.id, "catalog item persisted");

        match self.dispatcher.propagate(&item).await {
            Ok(()) => Ok(item),
            Err(SyncError::Delivery(reason)) => {
                warn!(item_id = %item.id, reason = %reason, "catalog item saved but event was not delivered");
                Ok(item)
            }
            Err(source @ SyncError::Remote { .. }) => Err(CatalogWriteError::Synchronization {
                item: Box::new(item),
                source,
            }),
        }
    }

    pub async fn list_items(&self) -> Result<Vec<CatalogItem>, StoreError> {
        self.store.get_all().await
    }

    pub async fn get_item(&self, id: CatalogItemId) -> Result<Option<CatalogItem>, StoreError> {
        self.store.get(id).await
    }
}
