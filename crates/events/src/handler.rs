//! Registration DSL shared by aggregates (fold callbacks) and event handlers
//! (publish callbacks).
//!
//! A type registers one callback against one or more event type names:
//!
//! ```ignore
//! fn register(handlers: &mut Handlers<Self>) {
//!     handlers.on(&[WidgetCreated::EVENT_TYPE, WidgetRenamed::EVENT_TYPE], |w, event| {
//!         w.name = event.payload["name"].as_str().unwrap_or_default().to_string();
//!         Ok(())
//!     });
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::envelope::StoredEvent;
use crate::registry::RegistryError;

/// A callback invoked with the target instance and the event being handled.
pub type Callback<T> = Arc<dyn Fn(&mut T, &StoredEvent) -> anyhow::Result<()> + Send + Sync>;

/// Collects `event type -> callback` registrations for one target type.
pub struct Handlers<T> {
    entries: Vec<(&'static str, Callback<T>)>,
}

impl<T> Handlers<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `callback` for every type in `event_types`.
    ///
    /// The same callback body is shared by all listed types.
    pub fn on<F>(&mut self, event_types: &[&'static str], callback: F) -> &mut Self
    where
        F: Fn(&mut T, &StoredEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        for event_type in event_types {
            self.entries.push((*event_type, callback.clone()));
        }
        self
    }

    /// Freeze the registrations into a lookup table.
    ///
    /// Each event type may be registered at most once per owner.
    pub fn build(self, owner: &'static str) -> Result<HandlerTable<T>, RegistryError> {
        let mut callbacks = HashMap::with_capacity(self.entries.len());
        for (event_type, callback) in self.entries {
            if callbacks.insert(event_type, callback).is_some() {
                return Err(RegistryError::DuplicateCallback {
                    owner,
                    event_type: event_type.to_string(),
                });
            }
        }
        Ok(HandlerTable { owner, callbacks })
    }
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only `event type -> callback` table.
pub struct HandlerTable<T> {
    owner: &'static str,
    callbacks: HashMap<&'static str, Callback<T>>,
}

impl<T> HandlerTable<T> {
    /// Build the table for `owner` using its registration function.
    pub fn from_registration(
        owner: &'static str,
        register: impl FnOnce(&mut Handlers<T>),
    ) -> Result<Self, RegistryError> {
        let mut handlers = Handlers::new();
        register(&mut handlers);
        handlers.build(owner)
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn get(&self, event_type: &str) -> Option<&Callback<T>> {
        self.callbacks.get(event_type)
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.callbacks.contains_key(event_type)
    }

    pub fn event_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.callbacks.keys().copied()
    }
}

impl<T> core::fmt::Debug for HandlerTable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut types: Vec<_> = self.event_types().collect();
        types.sort_unstable();
        f.debug_struct("HandlerTable")
            .field("owner", &self.owner)
            .field("event_types", &types)
            .finish()
    }
}

/// A subscriber notified after events are durably recorded.
///
/// A fresh instance is produced by the registered factory for every publish,
/// so handlers keep no per-invocation state between events.
pub trait EventHandler: Send + 'static {
    /// Stable handler name, referenced by event type bindings.
    const NAME: &'static str;

    fn register(handlers: &mut Handlers<Self>)
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foldwork_core::AggregateId;

    use crate::envelope::PendingEvent;

    #[derive(Default)]
    struct Tally {
        seen: Vec<String>,
    }

    fn event(event_type: &str) -> StoredEvent {
        StoredEvent::from_pending(
            PendingEvent::new(
                AggregateId::from("a1"),
                "tally",
                event_type,
                serde_json::Value::Null,
            ),
            1,
            Utc::now(),
        )
    }

    #[test]
    fn one_callback_serves_many_event_types() {
        let table = HandlerTable::from_registration("tally", |h: &mut Handlers<Tally>| {
            h.on(&["a.created", "a.renamed"], |t, e| {
                t.seen.push(e.event_type.clone());
                Ok(())
            });
        })
        .unwrap();

        let mut tally = Tally::default();
        for ty in ["a.created", "a.renamed"] {
            let ev = event(ty);
            (table.get(ty).unwrap())(&mut tally, &ev).unwrap();
        }

        assert_eq!(tally.seen, vec!["a.created", "a.renamed"]);
        assert!(!table.handles("a.deleted"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = HandlerTable::from_registration("tally", |h: &mut Handlers<Tally>| {
            h.on(&["a.created"], |_, _| Ok(()));
            h.on(&["a.created"], |_, _| Ok(()));
        })
        .unwrap_err();

        assert_eq!(
            err,
            RegistryError::DuplicateCallback {
                owner: "tally",
                event_type: "a.created".to_string(),
            }
        );
    }
}
