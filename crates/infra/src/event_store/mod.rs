//! Append-only event store boundary.
//!
//! The runtime only needs two operations from a persistence engine: append one
//! event to an aggregate's stream, and read a stream back in append order.
//! Anything that satisfies [`EventStore`] can back the runtime.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError};
