use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use foldwork_core::AggregateId;

use crate::event::DomainEvent;

/// Failure converting between typed events and their JSON envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("payload serialization failed for '{event_type}': {message}")]
    Serialize { event_type: String, message: String },

    #[error("payload deserialization failed for '{event_type}': {message}")]
    Deserialize { event_type: String, message: String },

    #[error("event type mismatch (expected '{expected}', found '{found}')")]
    TypeMismatch { expected: String, found: String },
}

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Created by a command handler; becomes durable only once the event store
/// accepts it and hands back a [`StoredEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub event_type: String,
    pub payload: JsonValue,
}

impl PendingEvent {
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            payload,
        }
    }

    /// Wrap a typed event, serializing it into the schema-free payload.
    pub fn prepare<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event: &E,
    ) -> Result<Self, EnvelopeError>
    where
        E: DomainEvent,
    {
        let payload = serde_json::to_value(event).map_err(|e| EnvelopeError::Serialize {
            event_type: E::EVENT_TYPE.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::new(aggregate_id, aggregate_type, E::EVENT_TYPE, payload))
    }
}

/// A stored event in an append-only stream.
///
/// This is the persisted record shape: the event store assigns
/// `sequence_number` (1, 2, 3, ... per aggregate) and `created_at` during
/// append. Stored events are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub payload: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Stamp a pending event with the ordering metadata assigned by a store.
    pub fn from_pending(
        pending: PendingEvent,
        sequence_number: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: pending.event_id,
            aggregate_id: pending.aggregate_id,
            aggregate_type: pending.aggregate_type,
            sequence_number,
            event_type: pending.event_type,
            payload: pending.payload,
            created_at,
        }
    }

    pub fn is<E: DomainEvent>(&self) -> bool {
        self.event_type == E::EVENT_TYPE
    }

    /// Deserialize the payload back into its typed event.
    pub fn decode<E>(&self) -> Result<E, EnvelopeError>
    where
        E: DomainEvent,
    {
        if !self.is::<E>() {
            return Err(EnvelopeError::TypeMismatch {
                expected: E::EVENT_TYPE.to_string(),
                found: self.event_type.clone(),
            });
        }

        serde_json::from_value(self.payload.clone()).map_err(|e| EnvelopeError::Deserialize {
            event_type: self.event_type.clone(),
            message: e.to_string(),
        })
    }
}
