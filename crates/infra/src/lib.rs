//! Infrastructure layer: stores, broker, synchronization, config.

pub mod catalog_writer;
pub mod config;
pub mod consumers;
pub mod event_bus;
pub mod seed;
pub mod store;
pub mod sync;
pub mod workers;

mod integration_tests;

pub use catalog_writer::{CatalogWriteError, CatalogWriter};
pub use config::{ConfigError, ServiceConfig, SyncStrategy};
pub use seed::{CatalogSeeder, SeedError, SeedOutcome};
pub use store::{EntityStore, Filter, InMemoryEntityStore, PostgresEntityStore, StoreError};
pub use sync::{EventPublisher, InventoryClient, SyncError, SynchronizationDispatcher};
