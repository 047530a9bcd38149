//! Command execution pipeline (application-level orchestration).
//!
//! ## Command Execution Flow
//!
//! ```text
//! Command
//!   ↓
//! 1. Validate (invalid commands stop here: nothing resolved, stored or published)
//!   ↓
//! 2. Resolve the command's handler (HandlerNotFound if unbound)
//!   ↓
//! 3. Handler loads the aggregate (replay, no side effects) and applies rules
//!   ↓
//! 4. For every new event: append → publish → fold
//! ```
//!
//! Steps run synchronously on the caller's thread. The dispatcher does not
//! serialise concurrent commands against the same aggregate; with
//! `ConcurrencyMode::Optimistic` the loser of such a race gets
//! `EventStoreError::Concurrency` instead of a silent lost update.

use std::sync::Arc;

use foldwork_core::AggregateId;

use crate::aggregate::Aggregate;
use crate::command::Command;
use crate::command_handler::CommandContext;
use crate::config::RuntimeConfig;
use crate::error::ExecuteError;
use crate::event_store::EventStore;
use crate::registry::Registry;
use crate::replay::Repository;

/// Reusable command execution engine.
///
/// ## Generic Parameters
///
/// - `S`: Event store implementation (must implement `EventStore` trait)
///
/// Use `InMemoryEventStore` in tests; any durable backend that honours the
/// `EventStore` contract can replace it without touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
    registry: Arc<Registry>,
    config: RuntimeConfig,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S, registry: Arc<Registry>) -> Self {
        Self::with_config(store, registry, RuntimeConfig::default())
    }

    pub fn with_config(store: S, registry: Arc<Registry>, config: RuntimeConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    pub fn into_parts(self) -> (S, Arc<Registry>) {
        (self.store, self.registry)
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    pub fn repository(&self) -> Repository<'_> {
        Repository::new(&self.store, &self.registry, self.config)
    }

    /// Rebuild an aggregate from its events (read side; no side effects).
    pub fn load<A>(&self, aggregate_id: &AggregateId) -> Result<A, ExecuteError>
    where
        A: Aggregate,
    {
        self.repository().load(aggregate_id)
    }

    /// Validate and dispatch a command to its handler.
    ///
    /// ## Errors
    ///
    /// - `Invalid`: validation failed; the handler never ran
    /// - `HandlerNotFound`: the command, an event fold or an event publish has no binding
    /// - `Domain`: the handler rejected the command
    /// - `Store`: an append failed (earlier events of this command stay stored)
    /// - `Publish`: an event was stored but its handler failed
    pub fn execute<C>(&self, command: C) -> Result<C::Output, ExecuteError>
    where
        C: Command,
    {
        let span = tracing::info_span!(
            "command",
            command_type = C::COMMAND_TYPE,
            aggregate_id = %command.aggregate_id()
        );
        let _entered = span.enter();

        // 1) Validate
        if let Err(errors) = command.check() {
            tracing::debug!(errors = %errors, "command rejected by validation");
            return Err(ExecuteError::Invalid(errors));
        }

        // 2) Resolve
        let binding = self.registry.commands().resolve::<C>()?;

        // 3) + 4) Run the handler
        let mut ctx = CommandContext::new(self.repository(), command.aggregate_id().clone());
        let result = (binding.invoke)(command, &mut ctx);

        match &result {
            Ok(_) => tracing::info!(
                handler = binding.handler,
                events = ctx.recorded().len(),
                "command executed"
            ),
            Err(err) if !ctx.recorded().is_empty() => tracing::warn!(
                handler = binding.handler,
                recorded = ctx.recorded().len(),
                error = %err,
                "command failed after recording events; recorded events are not rolled back"
            ),
            Err(err) => tracing::debug!(
                handler = binding.handler,
                error = %err,
                "command failed"
            ),
        }

        result
    }
}
