use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Event;

/// Envelope for a published event.
///
/// This is the unit written to a broker stream. `message_id` identifies one
/// publish call; a redelivered message keeps its id, a re-published one does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    message_id: Uuid,
    message_type: String,
    version: u32,
    sent_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        message_id: Uuid,
        message_type: impl Into<String>,
        version: u32,
        sent_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            message_id,
            message_type: message_type.into(),
            version,
            sent_at,
            payload,
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap an event for publishing, stamping a fresh message id and send time.
    pub fn wrap(event: E) -> Self {
        Self::new(
            Uuid::now_v7(),
            event.event_type(),
            event.version(),
            Utc::now(),
            event,
        )
    }
}
