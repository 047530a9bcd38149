//! Process-wide routing tables, assembled once at startup.
//!
//! ```ignore
//! let registry = Registry::builder()
//!     .aggregate::<Widget>()
//!     .event::<WidgetCreated>()
//!     .event::<WidgetRenamed>()
//!     .event_handler(move || WidgetCreatedHandler::new(catalog.clone()))
//!     .event_handler(move || WidgetCatalogHandler::new(catalog.clone()))
//!     .command::<CreateWidgetHandler>()
//!     .build()?;
//! ```
//!
//! `build()` validates every binding eagerly (each event an aggregate folds
//! must also be bound to a handler) and returns a read-only
//! [`Registry`]; wrap it in an `Arc` to share it between dispatchers and
//! threads.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use thiserror::Error;

use foldwork_events::{
    DomainEvent, EventHandler, EventHandlerRegistry, EventHandlerRegistryBuilder, HandlerTable,
};

use crate::aggregate::Aggregate;
use crate::command::Command;
use crate::command_handler::CommandHandler;
use crate::command_registry::CommandHandlerRegistry;
use crate::error::{HandlerKind, HandlerNotFound};

/// Misconfiguration detected by [`RegistryBuilder::build`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Events(#[from] foldwork_events::RegistryError),

    #[error("aggregate '{0}' is registered twice")]
    DuplicateAggregate(&'static str),

    #[error("command '{0}' has more than one handler")]
    DuplicateCommand(&'static str),

    #[error("handler '{handler}' acts on unregistered aggregate '{aggregate_type}'")]
    UnregisteredAggregate {
        handler: &'static str,
        aggregate_type: &'static str,
    },

    #[error("aggregate '{aggregate_type}' folds '{event_type}', which has no publish binding")]
    UnboundEvent {
        aggregate_type: &'static str,
        event_type: &'static str,
    },
}

struct PendingAggregate {
    type_id: TypeId,
    aggregate_type: &'static str,
    /// Fold keys, sorted.
    event_types: Vec<&'static str>,
    table: AggregateTable,
}


struct PendingCommand {
    command_type: &'static str,
    handler: &'static str,
    aggregate: TypeId,
    aggregate_type: &'static str,
    insert: fn(&mut CommandHandlerRegistry) -> bool,
}

fn insert_command<H: CommandHandler>(registry: &mut CommandHandlerRegistry) -> bool {
    registry.insert::<H>()
}

/// Collects registrations; see the module docs.
#[derive(Default)]
pub struct RegistryBuilder {
    aggregates: Vec<PendingAggregate>,
    events: EventHandlerRegistryBuilder,
    commands: Vec<PendingCommand>,
}

type AggregateTable = Result<Box<dyn Any + Send + Sync>, foldwork_events::RegistryError>;

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an aggregate type and its fold callbacks.
    pub fn aggregate<A>(mut self) -> Self
    where
        A: Aggregate,
    {
        let table = HandlerTable::<A>::from_registration(A::AGGREGATE_TYPE, A::register);
        let mut event_types: Vec<_> = table
            .as_ref()
            .map(|table| table.event_types().collect())
            .unwrap_or_default();
        event_types.sort_unstable();

        self.aggregates.push(PendingAggregate {
            type_id: TypeId::of::<A>(),
            aggregate_type: A::AGGREGATE_TYPE,
            event_types,
            table: table.map(|table| Box::new(table) as Box<dyn Any + Send + Sync>),
        });
        self
    }

    /// Register an event type's declared handler binding.
    pub fn event<E>(mut self) -> Self
    where
        E: DomainEvent,
    {
        self.events = self.events.bind::<E>();
        self
    }

    /// Register an event handler with the factory used to instantiate it.
    pub fn event_handler<H, F>(mut self, factory: F) -> Self
    where
        H: EventHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.events = self.events.handler(factory);
        self
    }

    /// Register the handler of `H::Command`.
    pub fn command<H>(mut self) -> Self
    where
        H: CommandHandler,
    {
        self.commands.push(PendingCommand {
            command_type: <H::Command as Command>::COMMAND_TYPE,
            handler: H::NAME,
            aggregate: TypeId::of::<H::Aggregate>(),
            aggregate_type: <H::Aggregate as Aggregate>::AGGREGATE_TYPE,
            insert: insert_command::<H>,
        });
        self
    }

    /// Validate every registration and freeze the registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let events = self.events.build()?;

        let mut aggregates = HashMap::with_capacity(self.aggregates.len());
        for pending in self.aggregates {
            let table = pending.table?;
            // Every event an aggregate can fold must be publishable.
            if let Some(event_type) = pending
                .event_types
                .iter()
                .copied()
                .find(|event_type| !events.is_bound(event_type))
            {
                return Err(RegistryError::UnboundEvent {
                    aggregate_type: pending.aggregate_type,
                    event_type,
                });
            }
            if aggregates.insert(pending.type_id, table).is_some() {
                return Err(RegistryError::DuplicateAggregate(pending.aggregate_type));
            }
        }

        let mut commands = CommandHandlerRegistry::new();
        for pending in self.commands {
            if !aggregates.contains_key(&pending.aggregate) {
                return Err(RegistryError::UnregisteredAggregate {
                    handler: pending.handler,
                    aggregate_type: pending.aggregate_type,
                });
            }
            if !(pending.insert)(&mut commands) {
                return Err(RegistryError::DuplicateCommand(pending.command_type));
            }
        }

        tracing::info!(
            aggregates = aggregates.len(),
            commands = commands.len(),
            "registry built"
        );

        Ok(Registry {
            aggregates,
            events,
            commands,
        })
    }
}

/// Read-only routing tables: aggregate fold callbacks, event handlers and
/// command handlers.
pub struct Registry {
    aggregates: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    events: EventHandlerRegistry,
    commands: CommandHandlerRegistry,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Fold callbacks of aggregate `A`.
    pub fn apply_table<A>(&self) -> Result<&HandlerTable<A>, HandlerNotFound>
    where
        A: Aggregate,
    {
        self.aggregates
            .get(&TypeId::of::<A>())
            .and_then(|table| table.downcast_ref::<HandlerTable<A>>())
            .ok_or_else(|| HandlerNotFound::new(HandlerKind::Apply, "registry", A::AGGREGATE_TYPE))
    }

    pub fn events(&self) -> &EventHandlerRegistry {
        &self.events
    }

    pub fn commands(&self) -> &CommandHandlerRegistry {
        &self.commands
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("aggregates", &self.aggregates.len())
            .field("events", &self.events)
            .field("commands", &self.commands)
            .finish()
    }
}
