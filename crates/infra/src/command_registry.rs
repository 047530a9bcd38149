//! Command handler registry: command type -> its single handler.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::aggregate::Aggregate;
use crate::command::Command;
use crate::command_handler::{CommandContext, CommandHandler};
use crate::error::{ExecuteError, HandlerKind, HandlerNotFound};

/// Entry point produced for a registered handler.
pub type Invoke<C> =
    fn(C, &mut CommandContext<'_>) -> Result<<C as Command>::Output, ExecuteError>;

/// Resolved route of one command type.
pub struct CommandBinding<C: Command> {
    pub handler: &'static str,
    pub aggregate_type: &'static str,
    pub invoke: Invoke<C>,
}

impl<C: Command> core::fmt::Debug for CommandBinding<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandBinding")
            .field("command_type", &C::COMMAND_TYPE)
            .field("handler", &self.handler)
            .field("aggregate_type", &self.aggregate_type)
            .finish()
    }
}

/// Human-readable description of a registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRoute {
    pub command_type: &'static str,
    pub handler: &'static str,
    pub aggregate_type: &'static str,
}

fn invoke<H>(
    command: H::Command,
    ctx: &mut CommandContext<'_>,
) -> Result<<H::Command as Command>::Output, ExecuteError>
where
    H: CommandHandler,
{
    H::new(command).execute(ctx)
}

struct Entry {
    route: CommandRoute,
    binding: Box<dyn Any + Send + Sync>,
}

/// Startup-built, read-only table; shared without locking.
#[derive(Default)]
pub struct CommandHandlerRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl CommandHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `H::Command` to `H`. Returns `false` when the command type already
    /// has a handler (the existing binding is kept).
    pub(crate) fn insert<H>(&mut self) -> bool
    where
        H: CommandHandler,
    {
        let key = TypeId::of::<H::Command>();
        if self.entries.contains_key(&key) {
            return false;
        }

        let binding = CommandBinding::<H::Command> {
            handler: H::NAME,
            aggregate_type: <H::Aggregate as Aggregate>::AGGREGATE_TYPE,
            invoke: invoke::<H>,
        };
        self.entries.insert(
            key,
            Entry {
                route: CommandRoute {
                    command_type: <H::Command as Command>::COMMAND_TYPE,
                    handler: H::NAME,
                    aggregate_type: binding.aggregate_type,
                },
                binding: Box::new(binding),
            },
        );
        true
    }

    /// Resolve the handler bound to command type `C`.
    pub fn resolve<C>(&self) -> Result<&CommandBinding<C>, HandlerNotFound>
    where
        C: Command,
    {
        self.entries
            .get(&TypeId::of::<C>())
            .and_then(|entry| entry.binding.downcast_ref::<CommandBinding<C>>())
            .ok_or_else(|| {
                HandlerNotFound::new(HandlerKind::Command, "command registry", C::COMMAND_TYPE)
            })
    }

    pub fn contains<C: Command>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    /// Every registered route, sorted by command type.
    pub fn describe(&self) -> Vec<CommandRoute> {
        let mut routes: Vec<_> = self.entries.values().map(|e| e.route.clone()).collect();
        routes.sort_by_key(|r| r.command_type);
        routes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl core::fmt::Debug for CommandHandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandHandlerRegistry")
            .field("routes", &self.describe())
            .finish()
    }
}
