use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use videopalace_core::InventoryRecordId;
use videopalace_events::CatalogItemAdded;
use videopalace_inventory::InventoryRecord;

use crate::store::{EntityStore, Filter, StoreError};

#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("inventory store error: {0}")]
    Store(#[from] StoreError),
}

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Created(InventoryRecordId),
    /// A record for this `source_id` already existed; nothing was written.
    Duplicate,
}

/// Materializes one inventory record per announced catalog item.
///
/// ## Idempotency
///
/// Duplicates are suppressed by looking up `source_id` before inserting. This is a
/// read-then-write check, not an atomic conditional insert: two deliveries of the
/// same event handled concurrently can both pass the check and create two records.
/// Sequential redeliveries are always collapsed.
#[derive(Debug, Clone)]
pub struct CatalogItemAddedConsumer<S> {
    inventory: S,
}

impl<S> CatalogItemAddedConsumer<S>
where
    S: EntityStore<InventoryRecord>,
{
    pub fn new(inventory: S) -> Self {
        Self { inventory }
    }

    #[instrument(skip(self, event), fields(source_id = %event.source_id), err)]
    pub async fn handle(&self, event: &CatalogItemAdded) -> Result<ConsumeOutcome, ConsumeError> {
        let existing = self
            .inventory
            .find(&Filter::eq("source_id", event.source_id))
            .await?;

        if let Some(record) = existing {
            debug!(record_id = %record.id, "inventory record already exists; skipping");
            return Ok(ConsumeOutcome::Duplicate);
        }

        let record = InventoryRecord::for_catalog_item(event.source_id, event.title.clone(), Utc::now());
        let id = record.id;
        self.inventory.create(record).await?;

        info!(record_id = %id, title = %event.title, "inventory record created");
        Ok(ConsumeOutcome::Created(id))
    }
}
