//! Event handler registry: routes durable events to their declared handler.
//!
//! The registry is assembled once at startup and is read-only afterwards, so a
//! single instance can be shared (e.g. behind an `Arc`) by every command
//! without locking.
//!
//! ## Resolution
//!
//! ```text
//! StoredEvent.event_type ──binding──▶ handler name ──table──▶ callback(fresh handler, event)
//! ```
//!
//! Bindings come from `DomainEvent::Handler`, never from the event's data.
//! Every missing link (no binding, unknown handler, handler without a callback
//! for the type) is a `HandlerNotFound` failure. `build()` rejects the
//! statically detectable ones up front.

use std::collections::HashMap;

use thiserror::Error;

use crate::envelope::StoredEvent;
use crate::event::DomainEvent;
use crate::handler::{EventHandler, HandlerTable};

/// Misconfiguration detected while assembling a registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("'{owner}' registers more than one callback for '{event_type}'")]
    DuplicateCallback {
        owner: &'static str,
        event_type: String,
    },

    #[error("event handler '{0}' is registered twice")]
    DuplicateHandler(&'static str),

    #[error("event type '{0}' is bound twice")]
    DuplicateBinding(&'static str),

    #[error("event type '{event_type}' is bound to unregistered handler '{handler}'")]
    UnknownHandler {
        event_type: &'static str,
        handler: &'static str,
    },

    #[error("handler '{handler}' has no callback for bound event type '{event_type}'")]
    MissingCallback {
        event_type: &'static str,
        handler: &'static str,
    },
}

/// Failure publishing a durable event.
///
/// By the time this is raised the event is already stored; callers must
/// surface it rather than drop it.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("no event handler for '{event_type}' (binding: {handler:?})")]
    HandlerNotFound {
        event_type: String,
        handler: Option<&'static str>,
    },

    #[error("event handler '{handler}' failed on '{event_type}': {source}")]
    Handler {
        event_type: String,
        handler: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

trait ErasedHandler: Send + Sync {
    fn handles(&self, event_type: &str) -> bool;

    fn dispatch(&self, event: &StoredEvent) -> Result<(), PublishError>;
}

struct Registered<H> {
    factory: Box<dyn Fn() -> H + Send + Sync>,
    table: HandlerTable<H>,
}

impl<H> ErasedHandler for Registered<H>
where
    H: EventHandler,
{
    fn handles(&self, event_type: &str) -> bool {
        self.table.handles(event_type)
    }

    fn dispatch(&self, event: &StoredEvent) -> Result<(), PublishError> {
        let callback = self
            .table
            .get(&event.event_type)
            .ok_or_else(|| PublishError::HandlerNotFound {
                event_type: event.event_type.clone(),
                handler: Some(H::NAME),
            })?;

        let mut handler = (self.factory)();
        callback(&mut handler, event).map_err(|source| PublishError::Handler {
            event_type: event.event_type.clone(),
            handler: H::NAME,
            source,
        })
    }
}

/// Collects handler and binding registrations; see [`EventHandlerRegistry`].
#[derive(Default)]
pub struct EventHandlerRegistryBuilder {
    handlers: Vec<(&'static str, Result<Box<dyn ErasedHandler>, RegistryError>)>,
    bindings: Vec<(&'static str, &'static str)>,
}

impl EventHandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler type.
    ///
    /// `factory` instantiates the handler for each publish; capture shared
    /// collaborators (read models, outboxes) in it.
    pub fn handler<H, F>(mut self, factory: F) -> Self
    where
        H: EventHandler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let registered = HandlerTable::from_registration(H::NAME, H::register).map(|table| {
            Box::new(Registered {
                factory: Box::new(factory),
                table,
            }) as Box<dyn ErasedHandler>
        });
        self.handlers.push((H::NAME, registered));
        self
    }

    /// Record the declared handler binding of event type `E`.
    pub fn bind<E>(mut self) -> Self
    where
        E: DomainEvent,
    {
        self.bindings
            .push((E::EVENT_TYPE, <E::Handler as EventHandler>::NAME));
        self
    }

    /// Validate every registration and freeze the registry.
    pub fn build(self) -> Result<EventHandlerRegistry, RegistryError> {
        let mut handlers: HashMap<&'static str, Box<dyn ErasedHandler>> =
            HashMap::with_capacity(self.handlers.len());
        for (name, registered) in self.handlers {
            let registered = registered?;
            if handlers.insert(name, registered).is_some() {
                return Err(RegistryError::DuplicateHandler(name));
            }
        }

        let mut bindings = HashMap::with_capacity(self.bindings.len());
        for (event_type, handler) in self.bindings {
            let Some(registered) = handlers.get(handler) else {
                return Err(RegistryError::UnknownHandler {
                    event_type,
                    handler,
                });
            };
            if !registered.handles(event_type) {
                return Err(RegistryError::MissingCallback {
                    event_type,
                    handler,
                });
            }
            if bindings.insert(event_type, handler).is_some() {
                return Err(RegistryError::DuplicateBinding(event_type));
            }
        }

        tracing::debug!(
            handlers = handlers.len(),
            bindings = bindings.len(),
            "event handler registry built"
        );

        Ok(EventHandlerRegistry { handlers, bindings })
    }
}

/// Startup-built mapping from event type to the handler notified on publish.
pub struct EventHandlerRegistry {
    handlers: HashMap<&'static str, Box<dyn ErasedHandler>>,
    bindings: HashMap<&'static str, &'static str>,
}

impl EventHandlerRegistry {
    pub fn builder() -> EventHandlerRegistryBuilder {
        EventHandlerRegistryBuilder::new()
    }

    /// A registry with no handlers; every publish fails with `HandlerNotFound`.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            bindings: HashMap::new(),
        }
    }

    /// Name of the handler bound to `event_type`, if any.
    pub fn binding(&self, event_type: &str) -> Option<&'static str> {
        self.bindings.get(event_type).copied()
    }

    pub fn is_bound(&self, event_type: &str) -> bool {
        self.bindings.contains_key(event_type)
    }

    /// Notify the handler bound to the event's type.
    ///
    /// Call only with events that are already durable.
    pub fn publish(&self, event: &StoredEvent) -> Result<(), PublishError> {
        let handler_name =
            self.binding(&event.event_type)
                .ok_or_else(|| PublishError::HandlerNotFound {
                    event_type: event.event_type.clone(),
                    handler: None,
                })?;

        let handler =
            self.handlers
                .get(handler_name)
                .ok_or_else(|| PublishError::HandlerNotFound {
                    event_type: event.event_type.clone(),
                    handler: Some(handler_name),
                })?;

        tracing::debug!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            sequence_number = event.sequence_number,
            handler = handler_name,
            "publishing event"
        );

        handler.dispatch(event).inspect_err(|err| {
            tracing::error!(
                event_type = %event.event_type,
                aggregate_id = %event.aggregate_id,
                sequence_number = event.sequence_number,
                error = %err,
                "event publication failed"
            );
        })
    }
}

impl core::fmt::Debug for EventHandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventHandlerRegistry")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl StoredEvent {
    /// Publish this event through `registry`.
    pub fn publish(&self, registry: &EventHandlerRegistry) -> Result<(), PublishError> {
        registry.publish(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use serde::{Deserialize, Serialize};

    use foldwork_core::AggregateId;

    use super::*;
    use crate::envelope::PendingEvent;
    use crate::handler::Handlers;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Auditor {
        log: Log,
        instance: usize,
    }

    impl EventHandler for Auditor {
        const NAME: &'static str = "auditor";

        fn register(handlers: &mut Handlers<Self>) {
            handlers.on(&[Opened::EVENT_TYPE, Closed::EVENT_TYPE], |h, e| {
                h.instance += 1;
                h.log
                    .lock()
                    .unwrap()
                    .push(format!("{}#{}", e.event_type, h.instance));
                Ok(())
            });
            handlers.on(&[Jammed::EVENT_TYPE], |_, _| {
                anyhow::bail!("door is jammed")
            });
        }
    }

    struct Silent;

    impl EventHandler for Silent {
        const NAME: &'static str = "silent";

        fn register(_handlers: &mut Handlers<Self>) {}
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Opened {}

    impl DomainEvent for Opened {
        const EVENT_TYPE: &'static str = "door.opened";
        type Handler = Auditor;
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Closed {}

    impl DomainEvent for Closed {
        const EVENT_TYPE: &'static str = "door.closed";
        type Handler = Auditor;
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Jammed {}

    impl DomainEvent for Jammed {
        const EVENT_TYPE: &'static str = "door.jammed";
        type Handler = Auditor;
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Knocked {}

    impl DomainEvent for Knocked {
        const EVENT_TYPE: &'static str = "door.knocked";
        type Handler = Silent;
    }

    fn stored<E: DomainEvent>(event: &E) -> StoredEvent {
        let pending = PendingEvent::prepare(AggregateId::from("d1"), "door", event).unwrap();
        StoredEvent::from_pending(pending, 1, Utc::now())
    }

    fn registry(log: &Log) -> EventHandlerRegistry {
        let log = log.clone();
        EventHandlerRegistry::builder()
            .handler(move || Auditor {
                log: log.clone(),
                instance: 0,
            })
            .bind::<Opened>()
            .bind::<Closed>()
            .bind::<Jammed>()
            .build()
            .unwrap()
    }

    #[test]
    fn publish_invokes_a_fresh_handler_per_event() {
        let log = Log::default();
        let registry = registry(&log);

        registry.publish(&stored(&Opened {})).unwrap();
        stored(&Closed {}).publish(&registry).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["door.opened#1".to_string(), "door.closed#1".to_string()]
        );
    }

    #[test]
    fn unbound_event_fails_with_handler_not_found() {
        let registry = registry(&Log::default());

        match registry.publish(&stored(&Knocked {})) {
            Err(PublishError::HandlerNotFound { event_type, handler }) => {
                assert_eq!(event_type, "door.knocked");
                assert_eq!(handler, None);
            }
            other => panic!("expected HandlerNotFound, got {other:?}"),
        }
    }

    #[test]
    fn handler_failures_are_reported_with_context() {
        let registry = registry(&Log::default());

        match registry.publish(&stored(&Jammed {})) {
            Err(PublishError::Handler { handler, source, .. }) => {
                assert_eq!(handler, "auditor");
                assert_eq!(source.to_string(), "door is jammed");
            }
            other => panic!("expected handler failure, got {other:?}"),
        }
    }

    #[test]
    fn build_rejects_bindings_without_a_callback() {
        let err = EventHandlerRegistry::builder()
            .handler(|| Silent)
            .bind::<Knocked>()
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::MissingCallback {
                event_type: "door.knocked",
                handler: "silent",
            }
        );
    }

    #[test]
    fn build_rejects_bindings_to_unregistered_handlers() {
        let err = EventHandlerRegistry::builder()
            .bind::<Opened>()
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::UnknownHandler {
                event_type: "door.opened",
                handler: "auditor",
            }
        );
    }

    #[test]
    fn build_rejects_duplicate_bindings() {
        let err = EventHandlerRegistry::builder()
            .handler(|| Auditor {
                log: Log::default(),
                instance: 0,
            })
            .bind::<Opened>()
            .bind::<Opened>()
            .build()
            .unwrap_err();

        assert_eq!(err, RegistryError::DuplicateBinding("door.opened"));
    }
}
