//! Integration tests for the catalog → inventory pipeline.
//!
//! Tests: CatalogWriter → EventPublisher → EventBus → ConsumerWorker → inventory store
//!
//! Verifies:
//! - Every catalog item written (or seeded) materializes exactly one inventory record
//! - Redelivered events do not create duplicates
//! - The catalog write does not wait for the inventory side

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use videopalace_catalog::{CatalogItem, NewCatalogItem};
    use videopalace_core::CatalogItemId;
    use videopalace_events::{CatalogItemAdded, EventBus, EventEnvelope, InMemoryEventBus, RetryPolicy};
    use videopalace_inventory::InventoryRecord;

    use crate::catalog_writer::CatalogWriter;
    use crate::seed::{CatalogSeeder, SeedOutcome};
    use crate::store::{EntityStore, Filter, InMemoryEntityStore};
    use crate::sync::EventPublisher;
    use crate::workers::{WorkerOptions, spawn_inventory_sync_worker};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<CatalogItemAdded>>>;

    struct Pipeline {
        bus: Bus,
        catalog: Arc<InMemoryEntityStore<CatalogItem>>,
        inventory: Arc<InMemoryEntityStore<InventoryRecord>>,
        publisher: EventPublisher<Bus>,
    }

    fn pipeline() -> Pipeline {
        let bus: Bus = Arc::new(InMemoryEventBus::new().with_block_timeout(Duration::from_millis(10)));
        Pipeline {
            publisher: EventPublisher::with_retry(bus.clone(), RetryPolicy::no_retry()),
            bus,
            catalog: Arc::new(InMemoryEntityStore::new()),
            inventory: Arc::new(InMemoryEntityStore::new()),
        }
    }

    fn worker_options() -> WorkerOptions {
        WorkerOptions {
            retry: RetryPolicy::fixed(3, Duration::from_millis(1)),
            backoff: Duration::from_millis(1),
            ..WorkerOptions::default()
        }
    }

    async fn inventory_eventually(
        inventory: &InMemoryEntityStore<InventoryRecord>,
        expected: usize,
    ) -> Vec<InventoryRecord> {
        // The pipeline is eventually consistent; poll briefly.
        for _ in 0..200 {
            let records = inventory.get_all().await.unwrap();
            if records.len() >= expected {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("inventory did not reach {expected} records within timeout");
    }

    #[tokio::test]
    async fn catalog_write_materializes_inventory() {
        let p = pipeline();
        let worker = spawn_inventory_sync_worker(&p.bus, p.inventory.clone(), "test-1", worker_options())
            .await
            .unwrap();
        let writer = CatalogWriter::new(p.catalog.clone(), p.publisher.clone());

        let item = writer
            .add_item(NewCatalogItem {
                title: "Ghostbusters".into(),
                description: "Who you gonna call?".into(),
                category: "Comedy".into(),
                rating: "PG".into(),
                release_year: 1984,
            })
            .await
            .unwrap();

        let records = inventory_eventually(&p.inventory, 1).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_id, item.id);
        assert_eq!(records[0].title, "Ghostbusters");
        assert_eq!(records[0].total_quantity, 1);
        assert_eq!(records[0].available_quantity, 1);
        assert_eq!(p.bus.pending("inventory"), 0);

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn duplicate_events_yield_a_single_record() {
        let p = pipeline();
        let worker = spawn_inventory_sync_worker(&p.bus, p.inventory.clone(), "test-1", worker_options())
            .await
            .unwrap();

        let event = CatalogItemAdded {
            source_id: CatalogItemId::new(),
            title: "Ghostbusters".into(),
        };
        p.bus.publish(EventEnvelope::wrap(event.clone())).await.unwrap();
        p.bus.publish(EventEnvelope::wrap(event.clone())).await.unwrap();

        inventory_eventually(&p.inventory, 1).await;
        for _ in 0..200 {
            if p.bus.pending("inventory") == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let records = p
            .inventory
            .get_all_matching(&Filter::eq("source_id", event.source_id))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].available_quantity, records[0].total_quantity);

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn events_published_before_the_consumer_starts_are_not_lost() {
        let p = pipeline();
        let seeder = CatalogSeeder::new(p.catalog.clone(), p.publisher.clone());

        assert_eq!(seeder.seed_if_empty().await.unwrap(), SeedOutcome::Seeded { count: 3 });

        let worker = spawn_inventory_sync_worker(&p.bus, p.inventory.clone(), "test-1", worker_options())
            .await
            .unwrap();

        let records = inventory_eventually(&p.inventory, 3).await;
        let catalog = p.catalog.get_all().await.unwrap();
        for item in &catalog {
            assert!(records.iter().any(|r| r.source_id == item.id && r.title == item.title));
        }

        worker.shutdown().await;
    }
}
