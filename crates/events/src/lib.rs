//! Integration events and the messaging mechanics used to move them between
//! services.
//!
//! The bus traits here are transport-agnostic; broker-backed implementations
//! live in `videopalace-infra`.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod integration;
pub mod retry;

pub use bus::{Delivery, EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{DeadLetter, InMemoryBusError, InMemoryEventBus, InMemorySubscription};
pub use integration::CatalogItemAdded;
pub use retry::RetryPolicy;
