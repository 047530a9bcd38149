//! Aggregate replay engine.
//!
//! Rebuilds aggregates from their event streams and records new events.
//!
//! ## Two ways an event reaches an aggregate
//!
//! - **Replay** (`load` / `replay`): the event is already durable. It is folded
//!   straight into state; nothing is appended or published, so loading an
//!   aggregate never re-triggers side effects.
//! - **Apply** (`apply`): the event was just produced by a command. It is
//!   appended, then published, then folded, in exactly that order.

use foldwork_core::{AggregateId, ExpectedVersion};
use foldwork_events::{HandlerTable, PendingEvent, StoredEvent};

use crate::aggregate::Aggregate;
use crate::config::{ConcurrencyMode, PublishFailurePolicy, RuntimeConfig};
use crate::error::{ExecuteError, HandlerKind, HandlerNotFound};
use crate::event_store::{EventStore, EventStoreError};
use crate::registry::Registry;

/// Loads and mutates aggregates on top of an event store.
///
/// Cheap to construct; it only borrows its collaborators.
#[derive(Clone, Copy)]
pub struct Repository<'a> {
    store: &'a dyn EventStore,
    registry: &'a Registry,
    config: RuntimeConfig,
}

impl<'a> Repository<'a> {
    pub fn new(store: &'a dyn EventStore, registry: &'a Registry, config: RuntimeConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// Rebuild an aggregate from its full event history.
    ///
    /// An unknown id yields `A::empty(id)`: "does not exist yet" is a valid
    /// state, not an error.
    pub fn load<A>(&self, aggregate_id: &AggregateId) -> Result<A, ExecuteError>
    where
        A: Aggregate,
    {
        let history = self.store.query(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = A::empty(aggregate_id.clone());
        if history.is_empty() {
            return Ok(aggregate);
        }

        let table = self.registry.apply_table::<A>()?;
        for event in &history {
            fold(table, &mut aggregate, event)?;
        }

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate_id,
            events = history.len(),
            version = aggregate.version(),
            "aggregate replayed"
        );

        Ok(aggregate)
    }

    /// Fold an already-durable event (no append, no publish).
    pub fn replay<A>(&self, aggregate: &mut A, event: &StoredEvent) -> Result<(), ExecuteError>
    where
        A: Aggregate,
    {
        let table = self.registry.apply_table::<A>()?;
        fold(table, aggregate, event)
    }

    /// Record a new event: append, then publish, then fold.
    ///
    /// The fold callback and the publish binding are resolved before anything
    /// is appended, so an event that could not be folded or published is never
    /// stored.
    pub fn apply<A>(&self, aggregate: &mut A, event: PendingEvent) -> Result<StoredEvent, ExecuteError>
    where
        A: Aggregate,
    {
        let table = self.registry.apply_table::<A>()?;
        if !table.handles(&event.event_type) {
            return Err(HandlerNotFound::new(
                HandlerKind::Apply,
                A::AGGREGATE_TYPE,
                event.event_type,
            )
            .into());
        }
        if !self.registry.events().is_bound(&event.event_type) {
            return Err(HandlerNotFound::new(
                HandlerKind::Publish,
                "event handler registry",
                event.event_type,
            )
            .into());
        }
        if &event.aggregate_id != aggregate.id() {
            return Err(EventStoreError::InvalidAppend(format!(
                "event targets '{}' but was applied to '{}'",
                event.aggregate_id,
                aggregate.id()
            ))
            .into());
        }

        let expected = match self.config.concurrency {
            ConcurrencyMode::Optimistic => ExpectedVersion::Exact(aggregate.version()),
            ConcurrencyMode::Unchecked => ExpectedVersion::Any,
        };

        // 1) Append (durable step)
        let stored = self.store.append(event, expected)?;

        // 2) Publish (the event is durable from here on)
        if let Err(err) = self.registry.events().publish(&stored) {
            let err = ExecuteError::from_publish(stored.clone(), err);
            let halt = !matches!(err, ExecuteError::Publish { .. })
                || self.config.publish_failure == PublishFailurePolicy::Halt;
            if halt {
                return Err(err);
            }
            tracing::error!(
                aggregate_type = A::AGGREGATE_TYPE,
                aggregate_id = %stored.aggregate_id,
                event_type = %stored.event_type,
                sequence_number = stored.sequence_number,
                error = %err,
                "publication failed; continuing"
            );
        }

        // 3) Fold into in-memory state
        fold(table, aggregate, &stored)?;

        Ok(stored)
    }
}

impl core::fmt::Debug for Repository<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn fold<A>(table: &HandlerTable<A>, aggregate: &mut A, event: &StoredEvent) -> Result<(), ExecuteError>
where
    A: Aggregate,
{
    let callback = table.get(&event.event_type).ok_or_else(|| {
        HandlerNotFound::new(HandlerKind::Apply, A::AGGREGATE_TYPE, event.event_type.clone())
    })?;

    callback(&mut *aggregate, event).map_err(|source| ExecuteError::Fold {
        aggregate_type: A::AGGREGATE_TYPE,
        event_type: event.event_type.clone(),
        source,
    })?;

    // Deterministic version tracking: last folded sequence number.
    aggregate.set_version(event.sequence_number);
    Ok(())
}

fn validate_loaded_stream(
    aggregate_id: &AggregateId,
    stream: &[StoredEvent],
) -> Result<(), ExecuteError> {
    // Guard against a buggy backend mixing streams or reordering events.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if &e.aggregate_id != aggregate_id {
            return Err(ExecuteError::Stream(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(ExecuteError::Stream(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn stored(aggregate_id: &str, sequence_number: u64) -> StoredEvent {
        StoredEvent::from_pending(
            PendingEvent::new(AggregateId::from(aggregate_id), "widget", "x", json!({})),
            sequence_number,
            Utc::now(),
        )
    }

    #[test]
    fn loaded_stream_must_be_strictly_increasing() {
        let id = AggregateId::from("a");
        assert!(validate_loaded_stream(&id, &[stored("a", 1), stored("a", 2)]).is_ok());
        assert!(matches!(
            validate_loaded_stream(&id, &[stored("a", 2), stored("a", 2)]),
            Err(ExecuteError::Stream(_))
        ));
        assert!(matches!(
            validate_loaded_stream(&id, &[stored("a", 0)]),
            Err(ExecuteError::Stream(_))
        ));
    }

    #[test]
    fn loaded_stream_must_belong_to_the_aggregate() {
        let id = AggregateId::from("a");
        assert!(matches!(
            validate_loaded_stream(&id, &[stored("a", 1), stored("b", 2)]),
            Err(ExecuteError::Stream(msg)) if msg.contains("index 1")
        ));
    }
}
