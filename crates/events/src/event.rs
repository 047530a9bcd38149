use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::handler::EventHandler;

/// A typed domain event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - scoped to exactly one aggregate
/// - designed to be **append-only**
///
/// Each event type names its discriminator and the event handler that is
/// notified once the event is durable. The binding is part of the type and
/// cannot vary with the event's data.
pub trait DomainEvent:
    Serialize + DeserializeOwned + Clone + core::fmt::Debug + Send + Sync + 'static
{
    /// Stable event name/type identifier (e.g. "widget.created").
    const EVENT_TYPE: &'static str;

    /// Handler notified when an event of this type is published.
    type Handler: EventHandler;
}
