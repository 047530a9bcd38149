//! Runtime layer: event store boundary, aggregate replay and the command
//! pipeline.

pub mod aggregate;
pub mod command;
pub mod command_dispatcher;
pub mod command_handler;
pub mod command_registry;
pub mod config;
pub mod error;
pub mod event_store;
pub mod registry;
pub mod replay;


pub use aggregate::Aggregate;
pub use command::Command;
pub use command_dispatcher::CommandDispatcher;
pub use command_handler::{CommandContext, CommandHandler};
pub use command_registry::{CommandBinding, CommandHandlerRegistry, CommandRoute};
pub use config::{ConcurrencyMode, PublishFailurePolicy, RuntimeConfig};
pub use error::{ExecuteError, HandlerKind, HandlerNotFound};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore};
pub use registry::{Registry, RegistryBuilder, RegistryError};
pub use replay::Repository;
