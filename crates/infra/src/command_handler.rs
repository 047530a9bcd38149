//! Command handlers and the context they run in.

use foldwork_core::AggregateId;
use foldwork_events::{DomainEvent, PendingEvent, StoredEvent};

use crate::aggregate::Aggregate;
use crate::command::Command;
use crate::error::ExecuteError;
use crate::replay::Repository;

/// Orchestrates one command type against one aggregate type.
///
/// A handler instance is created for every command it processes (`new`) and
/// consumed by `execute`, so no state leaks between invocations.
///
/// ```ignore
/// impl CommandHandler for CreateWidgetHandler {
///     const NAME: &'static str = "create_widget";
///     type Command = CreateWidget;
///     type Aggregate = Widget;
///
///     fn new(command: CreateWidget) -> Self { Self { command } }
///
///     fn execute(self, ctx: &mut CommandContext<'_>) -> Result<AggregateId, ExecuteError> {
///         let mut widget: Widget = ctx.load_target()?;
///         if widget.exists() { return Err(DomainError::conflict("exists").into()); }
///         ctx.apply(&mut widget, &WidgetCreated { name: self.command.name })?;
///         Ok(widget.id().clone())
///     }
/// }
/// ```
pub trait CommandHandler: Sized + 'static {
    /// Stable handler name (diagnostics).
    const NAME: &'static str;

    type Command: Command;

    /// The aggregate type this handler acts on.
    type Aggregate: Aggregate;

    fn new(command: Self::Command) -> Self;

    fn execute(
        self,
        ctx: &mut CommandContext<'_>,
    ) -> Result<<Self::Command as Command>::Output, ExecuteError>;
}

/// Per-command view of the runtime handed to a [`CommandHandler`].
#[derive(Debug)]
pub struct CommandContext<'a> {
    repository: Repository<'a>,
    target: AggregateId,
    recorded: Vec<StoredEvent>,
}

impl<'a> CommandContext<'a> {
    pub fn new(repository: Repository<'a>, target: AggregateId) -> Self {
        Self {
            repository,
            target,
            recorded: Vec::new(),
        }
    }

    /// Aggregate id carried by the command.
    pub fn target(&self) -> &AggregateId {
        &self.target
    }

    /// Rebuild any aggregate by replaying its events.
    pub fn load<A>(&self, aggregate_id: &AggregateId) -> Result<A, ExecuteError>
    where
        A: Aggregate,
    {
        self.repository.load(aggregate_id)
    }

    /// Rebuild the aggregate the command targets.
    pub fn load_target<A>(&self) -> Result<A, ExecuteError>
    where
        A: Aggregate,
    {
        self.repository.load(&self.target)
    }

    /// Record a new event on `aggregate`: append, publish, then fold.
    ///
    /// Returns the stored event; a copy is kept in [`recorded`](Self::recorded).
    pub fn apply<A, E>(&mut self, aggregate: &mut A, event: &E) -> Result<StoredEvent, ExecuteError>
    where
        A: Aggregate,
        E: DomainEvent,
    {
        let pending = PendingEvent::prepare(
            aggregate.id().clone(),
            A::AGGREGATE_TYPE,
            event,
        )?;
        let stored = self.repository.apply(aggregate, pending)?;
        self.recorded.push(stored.clone());
        Ok(stored)
    }

    /// Events recorded by this command so far, in append order.
    pub fn recorded(&self) -> &[StoredEvent] {
        &self.recorded
    }

    pub fn into_recorded(self) -> Vec<StoredEvent> {
        self.recorded
    }
}
