//! In-memory event bus for tests/dev.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;

use crate::bus::{Delivery, EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// Internal lock poisoning.
    #[error("in-memory bus lock poisoned")]
    Poisoned,

    /// Settling a delivery this group never handed out (or already settled).
    #[error("unknown delivery {0} for group {1}")]
    UnknownDelivery(String, String),
}

/// A message that exhausted its delivery attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter<M> {
    pub group: String,
    pub original_id: String,
    /// Handler runs made before giving up.
    pub attempts: u32,
    pub reason: String,
    pub message: M,
}

#[derive(Debug)]
struct GroupState<M> {
    ready: VecDeque<Delivery<M>>,
    in_flight: HashMap<String, Delivery<M>>,
}

#[derive(Debug)]
struct State<M> {
    next_seq: u64,
    log: Vec<(String, M)>,
    groups: HashMap<String, GroupState<M>>,
    dead_letters: Vec<DeadLetter<M>>,
}

#[derive(Debug)]
struct Shared<M> {
    state: Mutex<State<M>>,
    notify: Notify,
}

/// In-memory broker with consumer-group semantics.
///
/// - Every group sees every message (a group created late starts from the beginning)
/// - A delivery stays in flight until acked or dead-lettered
/// - Single process only; both services must share the same instance
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    shared: Arc<Shared<M>>,
    block: Duration,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long `receive` waits for new messages before returning an empty batch.
    pub fn with_block_timeout(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    next_seq: 0,
                    log: Vec::new(),
                    groups: HashMap::new(),
                    dead_letters: Vec::new(),
                }),
                notify: Notify::new(),
            }),
            block: Duration::from_millis(100),
        }
    }
}

impl<M: Clone> InMemoryEventBus<M> {
    /// Every message published so far, in publish order.
    pub fn published(&self) -> Vec<M> {
        match self.shared.state.lock() {
            Ok(state) => state.log.iter().map(|(_, m)| m.clone()).collect(),
            Err(_) => vec![],
        }
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter<M>> {
        match self.shared.state.lock() {
            Ok(state) => state.dead_letters.clone(),
            Err(_) => vec![],
        }
    }

    /// Deliveries of `group` that are waiting or in flight.
    pub fn pending(&self, group: &str) -> usize {
        match self.shared.state.lock() {
            Ok(state) => state
                .groups
                .get(group)
                .map(|g| g.ready.len() + g.in_flight.len())
                .unwrap_or(0),
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + Sync + 'static,
{
    type Error = InMemoryBusError;
    type Subscription = InMemorySubscription<M>;

    async fn publish(&self, message: M) -> Result<(), Self::Error> {
        {
            let mut state = self.shared.state.lock().map_err(|_| InMemoryBusError::Poisoned)?;
            state.next_seq += 1;
            let id = format!("{}-0", state.next_seq);

            for group in state.groups.values_mut() {
                group.ready.push_back(Delivery {
                    id: id.clone(),
                    attempt: 1,
                    message: message.clone(),
                });
            }
            state.log.push((id, message));
        }

        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn subscribe(&self, group: &str, _consumer: &str) -> Result<Self::Subscription, Self::Error> {
        let mut state = self.shared.state.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        if !state.groups.contains_key(group) {
            let ready = state
                .log
                .iter()
                .map(|(id, m)| Delivery {
                    id: id.clone(),
                    attempt: 1,
                    message: m.clone(),
                })
                .collect();
            state.groups.insert(
                group.to_string(),
                GroupState {
                    ready,
                    in_flight: HashMap::new(),
                },
            );
        }

        Ok(InMemorySubscription {
            shared: self.shared.clone(),
            group: group.to_string(),
            block: self.block,
        })
    }
}

/// Consumer-group handle returned by [`InMemoryEventBus::subscribe`].
#[derive(Debug)]
pub struct InMemorySubscription<M> {
    shared: Arc<Shared<M>>,
    group: String,
    block: Duration,
}

impl<M: Clone> InMemorySubscription<M> {
    fn take_ready(&self, max: usize) -> Result<Vec<Delivery<M>>, InMemoryBusError> {
        let mut state = self.shared.state.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        let Some(group) = state.groups.get_mut(&self.group) else {
            return Ok(vec![]);
        };

        let mut batch = Vec::new();
        while batch.len() < max {
            let Some(delivery) = group.ready.pop_front() else {
                break;
            };
            group.in_flight.insert(delivery.id.clone(), delivery.clone());
            batch.push(delivery);
        }
        Ok(batch)
    }

    fn settle(&self, delivery_id: &str) -> Result<Delivery<M>, InMemoryBusError> {
        let mut state = self.shared.state.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        state
            .groups
            .get_mut(&self.group)
            .and_then(|g| g.in_flight.remove(delivery_id))
            .ok_or_else(|| InMemoryBusError::UnknownDelivery(delivery_id.to_string(), self.group.clone()))
    }
}

#[async_trait]
impl<M> Subscription<M> for InMemorySubscription<M>
where
    M: Clone + Send + Sync + 'static,
{
    type Error = InMemoryBusError;

    async fn receive(&mut self, max: usize) -> Result<Vec<Delivery<M>>, Self::Error> {
        // Register interest before checking so a publish in between is not missed.
        let notified = self.shared.notify.notified();

        let batch = self.take_ready(max)?;
        if !batch.is_empty() {
            return Ok(batch);
        }

        let _ = tokio::time::timeout(self.block, notified).await;
        self.take_ready(max)
    }

    async fn ack(&mut self, delivery: &Delivery<M>) -> Result<(), Self::Error> {
        self.settle(&delivery.id).map(|_| ())
    }

    async fn dead_letter(
        &mut self,
        delivery: &Delivery<M>,
        attempts: u32,
        reason: &str,
    ) -> Result<(), Self::Error> {
        let settled = self.settle(&delivery.id)?;

        let mut state = self.shared.state.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        state.dead_letters.push(DeadLetter {
            group: self.group.clone(),
            original_id: settled.id,
            attempts,
            reason: reason.to_string(),
            message: settled.message,
        });
        Ok(())
    }
}
