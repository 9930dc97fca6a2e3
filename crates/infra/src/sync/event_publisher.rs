use async_trait::async_trait;
use tracing::{info, instrument};

use videopalace_catalog::CatalogItem;
use videopalace_events::{CatalogItemAdded, EventBus, EventEnvelope, RetryPolicy};

use super::{SyncError, SynchronizationDispatcher};

/// Decoupled strategy: publish `CatalogItemAdded` and let the inventory consumer
/// materialize the record.
///
/// Success means the broker accepted the event, not that inventory exists yet.
/// Each retry publishes a fresh envelope (new message id); consumers deduplicate
/// on the event's `source_id`, not on the message id.
#[derive(Debug, Clone)]
pub struct EventPublisher<B> {
    bus: B,
    retry: RetryPolicy,
}

impl<B> EventPublisher<B>
where
    B: EventBus<EventEnvelope<CatalogItemAdded>>,
{
    pub fn new(bus: B) -> Self {
        Self::with_retry(bus, RetryPolicy::default())
    }

    pub fn with_retry(bus: B, retry: RetryPolicy) -> Self {
        Self { bus, retry }
    }
}

#[async_trait]
impl<B> SynchronizationDispatcher for EventPublisher<B>
where
    B: EventBus<EventEnvelope<CatalogItemAdded>>,
{
    fn strategy(&self) -> &'static str {
        "events"
    }

    #[instrument(skip(self, item), fields(source_id = %item.id), err)]
    async fn propagate(&self, item: &CatalogItem) -> Result<(), SyncError> {
        let event = CatalogItemAdded {
            source_id: item.id,
            title: item.title.clone(),
        };

        let bus = &self.bus;
        self.retry
            .run("publish catalog.item.added", move |_| {
                let envelope = EventEnvelope::wrap(event.clone());
                async move { bus.publish(envelope).await }
            })
            .await
            .map_err(|e| SyncError::Delivery(e.to_string()))?;

        info!(source_id = %item.id, "published catalog.item.added");
        Ok(())
    }

    async fn propagate_all(&self, items: &[CatalogItem]) -> Result<(), SyncError> {
        for item in items {
            self.propagate(item).await?;
        }
        Ok(())
    }
}
