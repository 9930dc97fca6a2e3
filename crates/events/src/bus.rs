//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **event bus pattern** used between the catalog and
//! inventory services:
//!
//! - **Transport-agnostic**: Works with in-memory queues, Redis Streams, etc.
//! - **At-least-once delivery**: A message may be delivered more than once; consumers must be idempotent
//! - **No ordering guarantees** across messages
//! - **Consumer groups**: Each consuming service reads through a named group; every group
//!   sees every message, and within a group each message goes to one consumer
//!
//! A delivery stays pending in its group until it is acknowledged or dead-lettered.

use async_trait::async_trait;
use std::sync::Arc;

/// A message handed to a consumer, plus the broker bookkeeping needed to settle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<M> {
    /// Broker-assigned id used to acknowledge the delivery.
    pub id: String,
    /// How many times this message has been delivered to the group (1 on first delivery).
    pub attempt: u32,
    pub message: M,
}

/// A consumer-group subscription.
///
/// Subscriptions are designed for single-task consumption; run one per worker.
#[async_trait]
pub trait Subscription<M>: Send
where
    M: Send + Sync + 'static,
{
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wait briefly for up to `max` deliveries. An empty batch means nothing arrived
    /// before the transport's block timeout; callers should simply poll again.
    async fn receive(&mut self, max: usize) -> Result<Vec<Delivery<M>>, Self::Error>;

    /// Mark a delivery as processed; it will not be redelivered.
    async fn ack(&mut self, delivery: &Delivery<M>) -> Result<(), Self::Error>;

    /// Route a delivery to the dead-letter destination and settle the original.
    ///
    /// `attempts` is how many times the consumer ran its handler on this delivery.
    async fn dead_letter(
        &mut self,
        delivery: &Delivery<M>,
        attempts: u32,
        reason: &str,
    ) -> Result<(), Self::Error>;
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ## Delivery Guarantees
///
/// `publish()` returns once the transport has durably accepted the message. It says
/// nothing about whether any consumer has processed it.
///
/// ## Error Handling
///
/// `publish()` can fail (network error, broker unavailable). Failures are surfaced to
/// the caller, which owns the retry policy.
#[async_trait]
pub trait EventBus<M>: Send + Sync
where
    M: Send + Sync + 'static,
{
    type Error: std::error::Error + Send + Sync + 'static;
    type Subscription: Subscription<M, Error = Self::Error>;

    async fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Join (creating if needed) consumer group `group` as consumer `consumer`.
    async fn subscribe(&self, group: &str, consumer: &str) -> Result<Self::Subscription, Self::Error>;
}

#[async_trait]
impl<M, B> EventBus<M> for Arc<B>
where
    M: Send + Sync + 'static,
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;
    type Subscription = B::Subscription;

    async fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message).await
    }

    async fn subscribe(&self, group: &str, consumer: &str) -> Result<Self::Subscription, Self::Error> {
        (**self).subscribe(group, consumer).await
    }
}
