use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use videopalace_events::{Delivery, EventBus, RetryPolicy, Subscription};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// A message being handled when shutdown is requested is finished (or
    /// dead-lettered) first.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

/// Worker tuning.
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    /// Max deliveries requested per receive.
    pub batch_size: usize,
    /// Handler retries before a message is dead-lettered.
    pub retry: RetryPolicy,
    /// Pause after a failed receive.
    pub backoff: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry: RetryPolicy::default(),
            backoff: Duration::from_secs(1),
        }
    }
}

/// Generic consumer worker loop.
///
/// - Joins a consumer group on the bus
/// - Runs the handler for each delivery, retrying per [`WorkerOptions::retry`]
/// - Acks on success; dead-letters (and thereby acks) once retries are exhausted
/// - Supports graceful shutdown
#[derive(Debug)]
pub struct ConsumerWorker;

impl ConsumerWorker {
    /// Subscribe and spawn the worker task.
    ///
    /// `handler` must be idempotent (at-least-once delivery safe).
    pub async fn spawn<M, B, H, Fut, E>(
        name: &'static str,
        bus: &B,
        group: &str,
        consumer: &str,
        options: WorkerOptions,
        handler: H,
    ) -> Result<WorkerHandle, B::Error>
    where
        M: Clone + Send + Sync + 'static,
        B: EventBus<M>,
        B::Subscription: 'static,
        H: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let sub = bus.subscribe(group, consumer).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(worker = name, group, consumer, "consumer worker starting");
        let join = tokio::spawn(worker_loop(name, sub, shutdown_rx, options, handler));

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

async fn worker_loop<M, S, H, Fut, E>(
    name: &'static str,
    mut sub: S,
    shutdown_rx: watch::Receiver<bool>,
    options: WorkerOptions,
    handler: H,
) where
    M: Clone + Send + Sync + 'static,
    S: Subscription<M>,
    H: Fn(M) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    loop {
        // Shutdown check (non-blocking); a dropped handle also stops the worker.
        if *shutdown_rx.borrow() || shutdown_rx.has_changed().is_err() {
            break;
        }

        let batch = match sub.receive(options.batch_size).await {
            Ok(batch) => batch,
            Err(err) => {
                error!(worker = name, error = %err, "failed to receive from subscription");
                tokio::time::sleep(options.backoff).await;
                continue;
            }
        };

        for delivery in batch {
            process(name, &mut sub, &options.retry, &handler, delivery).await;
        }
    }

    info!(worker = name, "consumer worker stopped");
}

async fn process<M, S, H, Fut, E>(
    name: &'static str,
    sub: &mut S,
    retry: &RetryPolicy,
    handler: &H,
    delivery: Delivery<M>,
) where
    M: Clone + Send + Sync + 'static,
    S: Subscription<M>,
    H: Fn(M) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let outcome = retry.run(name, |_| handler(delivery.message.clone())).await;

    let settled = match outcome {
        Ok(()) => sub.ack(&delivery).await,
        Err(err) => {
            warn!(
                worker = name,
                message_id = %delivery.id,
                attempts = retry.max_attempts(),
                error = %err,
                "handler exhausted retries; dead-lettering message"
            );
            sub.dead_letter(&delivery, retry.max_attempts(), &err.to_string())
                .await
        }
    };

    if let Err(err) = settled {
        // Left pending; the broker redelivers it later.
        error!(worker = name, message_id = %delivery.id, error = %err, "failed to settle delivery");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use videopalace_events::InMemoryEventBus;

    fn bus() -> Arc<InMemoryEventBus<String>> {
        Arc::new(InMemoryEventBus::new().with_block_timeout(Duration::from_millis(10)))
    }

    fn options() -> WorkerOptions {
        WorkerOptions {
            batch_size: 10,
            retry: RetryPolicy::fixed(3, Duration::from_millis(1)),
            backoff: Duration::from_millis(1),
        }
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn successful_handling_acks_the_message() {
        let bus = bus();
        let seen = Arc::new(AtomicU32::new(0));
        let counter = seen.clone();

        let worker = ConsumerWorker::spawn("test", &bus, "inventory", "c1", options(), move |_msg: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await
        .unwrap();

        bus.publish("hello".to_string()).await.unwrap();

        eventually(|| seen.load(Ordering::SeqCst) == 1 && bus.pending("inventory") == 0).await;
        assert!(bus.dead_letters().is_empty());
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn failing_handler_is_retried_then_dead_lettered_and_acked() {
        let bus = bus();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let worker = ConsumerWorker::spawn("test", &bus, "inventory", "c1", options(), move |_msg: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("store unavailable")
            }
        })
        .await
        .unwrap();

        bus.publish("poison".to_string()).await.unwrap();

        eventually(|| bus.dead_letters().len() == 1).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(bus.pending("inventory"), 0);

        let dead = &bus.dead_letters()[0];
        assert_eq!(dead.message, "poison");
        assert_eq!(dead.reason, "store unavailable");
        assert_eq!(dead.attempts, 4);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn transient_handler_failure_recovers_without_dead_letter() {
        let bus = bus();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let worker = ConsumerWorker::spawn("test", &bus, "inventory", "c1", options(), move |_msg: String| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("blip")
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        bus.publish("hello".to_string()).await.unwrap();

        eventually(|| bus.pending("inventory") == 0 && calls.load(Ordering::SeqCst) == 2).await;
        assert!(bus.dead_letters().is_empty());
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_consuming() {
        let bus = bus();
        let seen = Arc::new(AtomicU32::new(0));
        let counter = seen.clone();

        let worker = ConsumerWorker::spawn("test", &bus, "inventory", "c1", options(), move |_msg: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await
        .unwrap();

        worker.shutdown().await;
        bus.publish("late".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(bus.pending("inventory"), 1);
    }
}
