use std::sync::Arc;

use thiserror::Error;

use foldwork_core::{AggregateId, ExpectedVersion};
use foldwork_events::{PendingEvent, StoredEvent};

/// Event store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The backend could not be reached or refused the operation.
    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only event store, one stream per aggregate id.
///
/// ## Append Semantics
///
/// `append()`:
/// - checks the expectation against the stream's current version
/// - assigns the next sequence number (`current_version + 1`) and `created_at`
/// - persists the event atomically
///
/// ## Query Semantics
///
/// `query()`:
/// - returns all events of the aggregate in sequence number order
/// - returns an empty vector if the stream doesn't exist (aggregate not yet created)
///
/// Implementations own no per-aggregate lock beyond what `append` needs to be
/// atomic; serialising whole commands is the caller's concern.
pub trait EventStore: Send + Sync {
    /// Append one event to its aggregate stream.
    fn append(
        &self,
        event: PendingEvent,
        expected_version: ExpectedVersion,
    ) -> Result<StoredEvent, EventStoreError>;

    /// Load the full stream of an aggregate.
    fn query(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        event: PendingEvent,
        expected_version: ExpectedVersion,
    ) -> Result<StoredEvent, EventStoreError> {
        (**self).append(event, expected_version)
    }

    fn query(&self, aggregate_id: &AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).query(aggregate_id)
    }
}
