//! Redis Streams-backed event bus (durable, at-least-once delivery).
//!
//! This implementation uses Redis Streams (XADD/XREADGROUP) to provide:
//! - **Durable delivery**: Messages persist until acknowledged
//! - **At-least-once**: Messages are redelivered if not ACK'd
//! - **Consumer groups**: Each consuming service has its own consumer group
//! - **Dead-letter handling**: Failed messages after max deliveries go to a DLQ stream
//!
//! ## Architecture
//!
//! - **Stream Key**: `videopalace:catalog.item.added` (one stream per message type)
//! - **Consumer Groups**: One per consuming service (e.g. `inventory`)
//! - **Consumers**: Named consumers within groups (e.g. `inventory-<uuid>`)
//! - **Dead-Letter Queue**: `videopalace:catalog.item.added:dead-letter`
//!
//! Entries that a crashed consumer left pending are re-claimed (XCLAIM) once they have
//! been idle for `pending_timeout`. Re-claimed entries whose delivery count already
//! exceeds `max_deliveries` are moved straight to the DLQ. The idle scan uses
//! `XPENDING ... IDLE`, which needs Redis 6.2 or newer.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use redis::streams::{
    StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadOptions, StreamReadReply,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, instrument, warn};

use videopalace_events::{Delivery, EventBus, RetryPolicy, Subscription};

/// Default stream key for catalog-item-added events
pub const DEFAULT_STREAM_KEY: &str = "videopalace:catalog.item.added";

/// Default dead-letter queue key
pub const DEFAULT_DLQ_KEY: &str = "videopalace:catalog.item.added:dead-letter";

/// Default max deliveries before a re-claimed entry is sent to the DLQ
const DEFAULT_MAX_DELIVERIES: u32 = 4;

/// Default pending entry timeout (entries idle longer than this are re-claimed)
const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Default XREADGROUP block timeout
const DEFAULT_BLOCK: Duration = Duration::from_secs(1);

/// Slack on top of the retry budget for the handler's own run time.
const PENDING_MARGIN: Duration = Duration::from_secs(30);

const PAYLOAD_FIELD: &str = "payload";

#[derive(Debug, thiserror::Error)]
pub enum RedisStreamsError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Consumer group error: {0}")]
    ConsumerGroup(String),
}

/// Stream names and redelivery knobs.
#[derive(Debug, Clone)]
pub struct RedisStreamsConfig {
    pub stream_key: String,
    pub dlq_key: String,
    /// Deliveries allowed before a re-claimed entry is dead-lettered.
    pub max_deliveries: u32,
    pub pending_timeout: Duration,
    pub block: Duration,
}

impl Default for RedisStreamsConfig {
    fn default() -> Self {
        Self {
            stream_key: DEFAULT_STREAM_KEY.to_string(),
            dlq_key: DEFAULT_DLQ_KEY.to_string(),
            max_deliveries: DEFAULT_MAX_DELIVERIES,
            pending_timeout: DEFAULT_PENDING_TIMEOUT,
            block: DEFAULT_BLOCK,
        }
    }
}

impl RedisStreamsConfig {
    /// Settings for consumers that retry in-process per `retry` and handle up to
    /// `batch_size` entries per read.
    ///
    /// An entry stays pending while every entry ahead of it in the batch uses up its
    /// retry budget, so `pending_timeout` must outlast that or a peer re-claims an
    /// entry that is still being handled.
    pub fn for_consumer(retry: &RetryPolicy, batch_size: usize) -> Self {
        let batch = u32::try_from(batch_size.max(1)).unwrap_or(u32::MAX);
        let busy = retry
            .interval
            .saturating_mul(retry.max_attempts())
            .saturating_mul(batch)
            .saturating_add(PENDING_MARGIN);

        Self {
            max_deliveries: retry.max_attempts(),
            pending_timeout: busy.max(DEFAULT_PENDING_TIMEOUT),
            ..Self::default()
        }
    }
}

/// Redis Streams event bus for messages of type `M` (stored as JSON).
pub struct RedisStreamsEventBus<M> {
    client: redis::Client,
    conn: MultiplexedConnection,
    config: RedisStreamsConfig,
    _message: PhantomData<fn() -> M>,
}

impl<M> Clone for RedisStreamsEventBus<M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            conn: self.conn.clone(),
            config: self.config.clone(),
            _message: PhantomData,
        }
    }
}

impl<M> std::fmt::Debug for RedisStreamsEventBus<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamsEventBus")
            .field("config", &self.config)
            .finish()
    }
}

impl<M> RedisStreamsEventBus<M> {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `config` - stream keys and redelivery settings
    pub async fn connect(
        redis_url: impl AsRef<str>,
        config: RedisStreamsConfig,
    ) -> Result<Self, RedisStreamsError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            conn,
            config,
            _message: PhantomData,
        })
    }

    /// Ensure a consumer group exists (idempotent).
    ///
    /// `MKSTREAM` creates the stream if needed; the group starts at `0` so a group
    /// created after messages were published still sees them.
    pub async fn ensure_consumer_group(&self, group_name: &str) -> Result<(), RedisStreamsError> {
        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.config.stream_key, group_name, "0")
            .await;

        match created {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(RedisStreamsError::ConsumerGroup(format!(
                "XGROUP CREATE {} failed: {}",
                group_name, e
            ))),
        }
    }
}

#[async_trait]
impl<M> EventBus<M> for RedisStreamsEventBus<M>
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Error = RedisStreamsError;
    type Subscription = RedisStreamsSubscription<M>;

    /// Append to the stream. Returns once Redis has replied to the XADD.
    #[instrument(skip(self, message), fields(stream_key = %self.config.stream_key), err)]
    async fn publish(&self, message: M) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisStreamsError::Serialization(e.to_string()))?;

        let mut conn = self.conn.clone();
        let _: String = conn
            .xadd(&self.config.stream_key, "*", &[(PAYLOAD_FIELD, payload.as_str())])
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XADD failed: {}", e)))?;

        Ok(())
    }

    /// Subscribe on a dedicated connection, since XREADGROUP blocks it.
    async fn subscribe(&self, group: &str, consumer: &str) -> Result<Self::Subscription, Self::Error> {
        self.ensure_consumer_group(group).await?;

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        Ok(RedisStreamsSubscription {
            conn,
            config: self.config.clone(),
            group: group.to_string(),
            consumer: consumer.to_string(),
            _message: PhantomData,
        })
    }
}

/// Consumer-group reader returned by [`RedisStreamsEventBus::subscribe`].
pub struct RedisStreamsSubscription<M> {
    conn: MultiplexedConnection,
    config: RedisStreamsConfig,
    group: String,
    consumer: String,
    _message: PhantomData<fn() -> M>,
}

impl<M> RedisStreamsSubscription<M>
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Re-claim entries other consumers left idle for too long.
    async fn reclaim_stale(&mut self, max: usize) -> Result<Vec<Delivery<M>>, RedisStreamsError> {
        let pending: StreamPendingCountReply = stale_pending_cmd(&self.config, &self.group, max)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XPENDING failed: {}", e)))?;

        let min_idle_ms = self.config.pending_timeout.as_millis() as usize;
        let stale: HashMap<String, u32> = pending
            .ids
            .into_iter()
            .map(|p| (p.id, p.times_delivered as u32))
            .collect();

        if stale.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<&String> = stale.keys().collect();
        let claimed: StreamClaimReply = self
            .conn
            .xclaim(&self.config.stream_key, &self.group, &self.consumer, min_idle_ms, &ids[..])
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XCLAIM failed: {}", e)))?;

        let (deliveries, rejected) = split_claimed::<M>(claimed.ids, &stale, self.config.max_deliveries);
        for (entry, attempt, reason) in rejected {
            self.move_to_dlq(&entry, attempt, &reason).await?;
        }

        Ok(deliveries)
    }

    async fn read_new(&mut self, max: usize) -> Result<Vec<Delivery<M>>, RedisStreamsError> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(max)
            .block(self.config.block.as_millis() as usize);

        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[&self.config.stream_key], &[">"], &options)
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XREADGROUP failed: {}", e)))?;

        let Some(reply) = reply else {
            return Ok(vec![]);
        };

        let mut deliveries = Vec::new();
        for key in reply.keys {
            for entry in key.ids {
                match decode_entry::<M>(&entry) {
                    Ok(message) => deliveries.push(Delivery {
                        id: entry.id,
                        attempt: 1,
                        message,
                    }),
                    Err(e) => self.move_to_dlq(&entry, 1, &e.to_string()).await?,
                }
            }
        }

        Ok(deliveries)
    }

    /// Copy a raw entry to the DLQ and acknowledge the original.
    async fn move_to_dlq(
        &mut self,
        entry: &StreamId,
        attempts: u32,
        reason: &str,
    ) -> Result<(), RedisStreamsError> {
        let payload: String = entry.get(PAYLOAD_FIELD).unwrap_or_default();
        self.send_to_dlq(&entry.id, &payload, attempts, reason).await?;
        self.xack(&entry.id).await
    }

    async fn send_to_dlq(
        &mut self,
        original_message_id: &str,
        payload: &str,
        attempts: u32,
        reason: &str,
    ) -> Result<(), RedisStreamsError> {
        let attempts = attempts.to_string();
        let failed_at = chrono::Utc::now().to_rfc3339();

        let _: String = self
            .conn
            .xadd(
                &self.config.dlq_key,
                "*",
                &[
                    ("original_message_id", original_message_id),
                    ("group", self.group.as_str()),
                    ("attempts", attempts.as_str()),
                    ("reason", reason),
                    ("failed_at", failed_at.as_str()),
                    (PAYLOAD_FIELD, payload),
                ],
            )
            .await
            .map_err(|e| RedisStreamsError::Command(format!("DLQ XADD failed: {}", e)))?;

        warn!(
            message_id = %original_message_id,
            attempts = %attempts,
            reason,
            "Message sent to dead-letter queue"
        );

        Ok(())
    }

    async fn xack(&mut self, id: &str) -> Result<(), RedisStreamsError> {
        let _: u64 = self
            .conn
            .xack(&self.config.stream_key, &self.group, &[id])
            .await
            .map_err(|e| RedisStreamsError::Command(format!("XACK failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl<M> Subscription<M> for RedisStreamsSubscription<M>
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Error = RedisStreamsError;

    #[instrument(skip(self), fields(group = %self.group, consumer = %self.consumer), err)]
    async fn receive(&mut self, max: usize) -> Result<Vec<Delivery<M>>, Self::Error> {
        let reclaimed = match self.reclaim_stale(max).await {
            Ok(reclaimed) => reclaimed,
            Err(e) => {
                // Re-claiming is best effort; new entries can still be read.
                error!(error = %e, "failed to re-claim pending entries");
                vec![]
            }
        };
        if !reclaimed.is_empty() {
            return Ok(reclaimed);
        }

        self.read_new(max).await
    }

    async fn ack(&mut self, delivery: &Delivery<M>) -> Result<(), Self::Error> {
        self.xack(&delivery.id).await
    }

    async fn dead_letter(
        &mut self,
        delivery: &Delivery<M>,
        attempts: u32,
        reason: &str,
    ) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&delivery.message)
            .map_err(|e| RedisStreamsError::Serialization(e.to_string()))?;
        self.send_to_dlq(&delivery.id, &payload, attempts, reason).await?;
        self.xack(&delivery.id).await
    }
}

/// Sort re-claimed entries into redeliveries and entries bound for the DLQ
/// (too many deliveries, or an undecodable payload).
fn split_claimed<M: DeserializeOwned>(
    entries: Vec<StreamId>,
    times_delivered: &HashMap<String, u32>,
    max_deliveries: u32,
) -> (Vec<Delivery<M>>, Vec<(StreamId, u32, String)>) {
    let mut deliveries = Vec::new();
    let mut rejected = Vec::new();

    for entry in entries {
        // XCLAIM itself counts as one more delivery.
        let attempt = times_delivered.get(&entry.id).copied().unwrap_or(0) + 1;

        if attempt > max_deliveries {
            rejected.push((entry, attempt, "max deliveries exceeded".to_string()));
            continue;
        }

        match decode_entry::<M>(&entry) {
            Ok(message) => deliveries.push(Delivery {
                id: entry.id,
                attempt,
                message,
            }),
            Err(e) => rejected.push((entry, attempt, e.to_string())),
        }
    }

    (deliveries, rejected)
}

/// `XPENDING <stream> <group> IDLE <ms> - + <max>`: only entries idle past the
/// timeout, so in-flight entries at the head of the list cannot hide stale ones.
fn stale_pending_cmd(config: &RedisStreamsConfig, group: &str, max: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("XPENDING");
    cmd.arg(&config.stream_key)
        .arg(group)
        .arg("IDLE")
        .arg(config.pending_timeout.as_millis() as u64)
        .arg("-")
        .arg("+")
        .arg(max);
    cmd
}

/// Parse the JSON payload field of a stream entry.
fn decode_entry<M: DeserializeOwned>(entry: &StreamId) -> Result<M, RedisStreamsError> {
    let payload: String = entry.get(PAYLOAD_FIELD).ok_or_else(|| {
        RedisStreamsError::Deserialization(format!("entry {} has no payload field", entry.id))
    })?;

    serde_json::from_str(&payload).map_err(|e| {
        RedisStreamsError::Deserialization(format!("entry {}: failed to deserialize payload: {}", entry.id, e))
    })
}
