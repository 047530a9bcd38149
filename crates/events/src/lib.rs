//! Event model, handler registration DSL and the event handler registry.

pub mod envelope;
pub mod event;
pub mod handler;
pub mod registry;

pub use envelope::{EnvelopeError, PendingEvent, StoredEvent};
pub use event::DomainEvent;
pub use handler::{Callback, EventHandler, HandlerTable, Handlers};
pub use registry::{EventHandlerRegistry, EventHandlerRegistryBuilder, PublishError, RegistryError};
