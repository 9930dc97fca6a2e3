//! Development-time catalog bootstrap.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use videopalace_catalog::{CatalogItem, NewCatalogItem};
use videopalace_core::DomainError;

use crate::store::{EntityStore, StoreError};
use crate::sync::{SyncError, SynchronizationDispatcher};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("seeded items were not synchronized: {0}")]
    Synchronization(#[from] SyncError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The catalog already had items; nothing was written.
    Skipped,
    Seeded { count: usize },
}

/// The fixed sample catalog.
pub fn sample_catalog() -> Vec<NewCatalogItem> {
    vec![
        NewCatalogItem {
            title: "Ghostbusters".into(),
            description: "Three parapsychologists start a ghost-catching business in New York City.".into(),
            category: "Comedy".into(),
            rating: "PG".into(),
            release_year: 1984,
        },
        NewCatalogItem {
            title: "Avengers: Endgame".into(),
            description: "The surviving Avengers assemble once more to undo the Snap.".into(),
            category: "Action".into(),
            rating: "PG-13".into(),
            release_year: 2019,
        },
        NewCatalogItem {
            title: "Close Encounters of the Third Kind".into(),
            description: "An electrical lineman is drawn to a rendezvous with alien visitors.".into(),
            category: "Sci-Fi".into(),
            rating: "PG".into(),
            release_year: 1977,
        },
    ]
}

/// Seeds an empty catalog and pushes the seeded items through the dispatcher.
#[derive(Debug, Clone)]
pub struct CatalogSeeder<S, D> {
    store: S,
    dispatcher: D,
}

impl<S, D> CatalogSeeder<S, D>
where
    S: EntityStore<CatalogItem>,
    D: SynchronizationDispatcher,
{
    pub fn new(store: S, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }

    /// Insert the sample catalog when the store is empty, then propagate it.
    ///
    /// Safe to call on every start. Not safe against two hosts starting at once:
    /// both can see an empty store. Partial writes are not rolled back.
    #[instrument(skip(self), fields(strategy = self.dispatcher.strategy()), err)]
    pub async fn seed_if_empty(&self) -> Result<SeedOutcome, SeedError> {
        if !self.store.is_empty().await? {
            info!("catalog already populated; skipping seed");
            return Ok(SeedOutcome::Skipped);
        }

        let now = Utc::now();
        let items = sample_catalog()
            .into_iter()
            .map(|input| CatalogItem::create(input, now))
            .collect::<Result<Vec<_>, _>>()?;

        self.store.bulk_create(items.clone()).await?;
        self.dispatcher.propagate_all(&items).await?;

        info!(count = items.len(), "catalog seeded");
        Ok(SeedOutcome::Seeded { count: items.len() })
    }
}
