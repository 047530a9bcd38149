use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use foldwork_core::{AggregateId, ExpectedVersion};
use foldwork_events::{PendingEvent, StoredEvent};

use super::r#trait::{EventStore, EventStoreError};

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<AggregateId, Vec<StoredEvent>>,
    /// Every stored event in global append order.
    log: Vec<StoredEvent>,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    /// Total number of stored events across all aggregates.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored event in global append order.
    pub fn all(&self) -> Vec<StoredEvent> {
        self.inner
            .read()
            .map(|inner| inner.log.clone())
            .unwrap_or_default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        event: PendingEvent,
        expected_version: ExpectedVersion,
    ) -> Result<StoredEvent, EventStoreError> {
        if event.event_type.trim().is_empty() {
            return Err(EventStoreError::InvalidAppend(
                "event_type must not be blank".to_string(),
            ));
        }

        let mut inner = self
            .inner
            .write()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        let stream = inner.streams.entry(event.aggregate_id.clone()).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "stream '{}': expected {expected_version:?}, found {current}",
                event.aggregate_id
            )));
        }

        // Enforce aggregate type stability across the stream.
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != event.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, event.aggregate_type
                )));
            }
        }

        let stored = StoredEvent::from_pending(event, current + 1, Utc::now());
        stream.push(stored.clone());
        inner.log.push(stored.clone());

        Ok(stored)
    }

    fn query(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(inner.streams.get(aggregate_id).cloned().unwrap_or_default())
    }
}
