//! Service wiring: picks store, broker and synchronization strategy from config.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use videopalace_catalog::CatalogItem;
use videopalace_core::Entity;
use videopalace_events::{CatalogItemAdded, EventEnvelope, InMemoryEventBus};
use videopalace_infra::event_bus::{RedisStreamsConfig, RedisStreamsEventBus};
use videopalace_infra::workers::{WorkerHandle, WorkerOptions, spawn_inventory_sync_worker};
use videopalace_infra::{
    CatalogSeeder, CatalogWriter, EntityStore, EventPublisher, InMemoryEntityStore, InventoryClient,
    PostgresEntityStore, ServiceConfig, SyncStrategy, SynchronizationDispatcher,
};
use videopalace_inventory::InventoryRecord;

pub type CatalogEnvelope = EventEnvelope<CatalogItemAdded>;
pub type CatalogStore = Arc<dyn EntityStore<CatalogItem>>;
pub type InventoryStore = Arc<dyn EntityStore<InventoryRecord>>;
pub type Dispatcher = Arc<dyn SynchronizationDispatcher>;

pub const CATALOG_COLLECTION: &str = "catalog_items";
pub const INVENTORY_COLLECTION: &str = "inventory_records";

/// Broker carrying `CatalogItemAdded` events.
#[derive(Debug, Clone)]
pub enum Broker {
    /// Process-local; only useful when both services share one process.
    InMemory(Arc<InMemoryEventBus<CatalogEnvelope>>),
    Redis(RedisStreamsEventBus<CatalogEnvelope>),
}

impl Broker {
    pub async fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        match &config.redis_url {
            Some(url) => {
                let options = worker_options(config);
                let streams = RedisStreamsConfig::for_consumer(&options.retry, options.batch_size);
                let pending_timeout_secs = streams.pending_timeout.as_secs();
                let bus = RedisStreamsEventBus::connect(url, streams)
                    .await
                    .context("failed to connect to Redis")?;
                info!(pending_timeout_secs, "using Redis Streams broker");
                Ok(Self::Redis(bus))
            }
            None => {
                warn!("REDIS_URL not set; events stay inside this process");
                Ok(Self::InMemory(Arc::new(InMemoryEventBus::new())))
            }
        }
    }
}

pub struct CatalogServices {
    pub writer: CatalogWriter<CatalogStore, Dispatcher>,
    pub seeder: CatalogSeeder<CatalogStore, Dispatcher>,
}

impl CatalogServices {
    pub fn new(store: CatalogStore, dispatcher: Dispatcher) -> Self {
        Self {
            writer: CatalogWriter::new(store.clone(), dispatcher.clone()),
            seeder: CatalogSeeder::new(store, dispatcher),
        }
    }
}

pub struct InventoryServices {
    pub store: InventoryStore,
}

impl InventoryServices {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }
}

/// In-memory (or Postgres when `DATABASE_URL` is set) store for one collection.
pub async fn entity_store<T>(
    config: &ServiceConfig,
    collection: &str,
) -> anyhow::Result<Arc<dyn EntityStore<T>>>
where
    T: Entity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let Some(url) = &config.database_url else {
        return Ok(Arc::new(InMemoryEntityStore::new()));
    };

    let pool = PgPool::connect(url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PostgresEntityStore::new(pool, collection)?;
    store.ensure_collection().await?;
    info!(collection, "using Postgres entity store");
    Ok(Arc::new(store))
}

/// The synchronization strategy selected by `SYNC_STRATEGY`.
pub fn dispatcher(config: &ServiceConfig, broker: &Broker) -> Dispatcher {
    match (config.sync_strategy, broker) {
        (SyncStrategy::Events, Broker::InMemory(bus)) => {
            Arc::new(EventPublisher::with_retry(bus.clone(), config.retry))
        }
        (SyncStrategy::Events, Broker::Redis(bus)) => {
            Arc::new(EventPublisher::with_retry(bus.clone(), config.retry))
        }
        (SyncStrategy::Direct, _) => Arc::new(InventoryClient::new(config.inventory_base_url.clone())),
    }
}

pub async fn build_catalog_services(config: &ServiceConfig, broker: &Broker) -> anyhow::Result<CatalogServices> {
    let store = entity_store::<CatalogItem>(config, CATALOG_COLLECTION).await?;
    let dispatcher = dispatcher(config, broker);
    info!(strategy = dispatcher.strategy(), "catalog synchronization strategy selected");
    Ok(CatalogServices::new(store, dispatcher))
}

pub async fn build_inventory_services(config: &ServiceConfig) -> anyhow::Result<InventoryServices> {
    let store = entity_store::<InventoryRecord>(config, INVENTORY_COLLECTION).await?;
    Ok(InventoryServices::new(store))
}

/// Consumer settings shared by the worker and the broker's re-claim timeout.
pub fn worker_options(config: &ServiceConfig) -> WorkerOptions {
    WorkerOptions {
        retry: config.retry,
        ..WorkerOptions::default()
    }
}

/// Start the catalog-event consumer when the event strategy is active.
pub async fn spawn_inventory_worker(
    config: &ServiceConfig,
    broker: &Broker,
    store: InventoryStore,
) -> anyhow::Result<Option<WorkerHandle>> {
    if config.sync_strategy != SyncStrategy::Events {
        return Ok(None);
    }

    let consumer_name = format!("{}-{}", config.service_name, Uuid::now_v7());
    let options = worker_options(config);

    let handle = match broker {
        Broker::InMemory(bus) => spawn_inventory_sync_worker(bus, store, &consumer_name, options).await?,
        Broker::Redis(bus) => spawn_inventory_sync_worker(bus, store, &consumer_name, options).await?,
    };
    Ok(Some(handle))
}
