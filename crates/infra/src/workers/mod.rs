//! Background workers.

pub mod consumer_worker;

use std::sync::Arc;

use videopalace_events::{CatalogItemAdded, EventBus, EventEnvelope};
use videopalace_inventory::InventoryRecord;

use crate::consumers::CatalogItemAddedConsumer;
use crate::store::EntityStore;

pub use consumer_worker::{ConsumerWorker, WorkerHandle, WorkerOptions};

/// Consumer group the inventory service reads catalog events through.
pub const INVENTORY_CONSUMER_GROUP: &str = "inventory";

/// Run the inventory consumer against `bus`, writing records into `inventory`.
pub async fn spawn_inventory_sync_worker<B, S>(
    bus: &B,
    inventory: S,
    consumer_name: &str,
    options: WorkerOptions,
) -> Result<WorkerHandle, B::Error>
where
    B: EventBus<EventEnvelope<CatalogItemAdded>>,
    B::Subscription: 'static,
    S: EntityStore<InventoryRecord> + 'static,
{
    let consumer = Arc::new(CatalogItemAddedConsumer::new(inventory));

    ConsumerWorker::spawn(
        "inventory.catalog_item_added",
        bus,
        INVENTORY_CONSUMER_GROUP,
        consumer_name,
        options,
        move |envelope: EventEnvelope<CatalogItemAdded>| {
            let consumer = consumer.clone();
            async move { consumer.handle(envelope.payload()).await.map(|_| ()) }
        },
    )
    .await
}
