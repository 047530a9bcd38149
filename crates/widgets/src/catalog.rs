//! Widget catalog read model and the event handlers that maintain it.
//!
//! The catalog is disposable: it is only ever written by published events
//! and can be rebuilt by publishing the stream again. Each entry remembers
//! the last sequence number it absorbed, so redelivered events are ignored.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;

use foldwork_core::AggregateId;
use foldwork_events::{DomainEvent, EventHandler, Handlers, StoredEvent};

use crate::widget::{WidgetCreated, WidgetDiscontinued, WidgetRenamed};

/// Queryable widget view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: AggregateId,
    pub name: String,
    pub discontinued: bool,
    pub last_sequence: u64,
}

/// Shared, thread-safe widget catalog.
#[derive(Debug, Clone, Default)]
pub struct WidgetCatalog {
    inner: Arc<RwLock<BTreeMap<AggregateId, CatalogEntry>>>,
}

impl WidgetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &AggregateId) -> Option<CatalogEntry> {
        let map = self.inner.read().ok()?;
        map.get(id).cloned()
    }

    /// All entries, ordered by id.
    pub fn list(&self) -> Vec<CatalogEntry> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    /// Entries that are not discontinued.
    pub fn active(&self) -> Vec<CatalogEntry> {
        self.list().into_iter().filter(|e| !e.discontinued).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear everything (rebuild support).
    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }

    fn insert(&self, event: &StoredEvent, name: String) -> anyhow::Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("widget catalog lock poisoned"))?;
        if map
            .get(&event.aggregate_id)
            .is_some_and(|entry| entry.last_sequence >= event.sequence_number)
        {
            return Ok(());
        }
        map.insert(
            event.aggregate_id.clone(),
            CatalogEntry {
                id: event.aggregate_id.clone(),
                name,
                discontinued: false,
                last_sequence: event.sequence_number,
            },
        );
        Ok(())
    }

    fn update(&self, event: &StoredEvent, change: impl FnOnce(&mut CatalogEntry)) -> anyhow::Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("widget catalog lock poisoned"))?;
        let entry = map
            .get_mut(&event.aggregate_id)
            .ok_or_else(|| anyhow!("widget '{}' is not in the catalog", event.aggregate_id))?;
        if entry.last_sequence >= event.sequence_number {
            return Ok(());
        }
        change(entry);
        entry.last_sequence = event.sequence_number;
        Ok(())
    }
}

/// Handles `widget.created`: adds the widget to the catalog.
#[derive(Debug)]
pub struct WidgetCreatedHandler {
    catalog: WidgetCatalog,
}

impl WidgetCreatedHandler {
    pub fn new(catalog: WidgetCatalog) -> Self {
        Self { catalog }
    }
}

impl EventHandler for WidgetCreatedHandler {
    const NAME: &'static str = "widget_created";

    fn register(handlers: &mut Handlers<Self>) {
        handlers.on(&[WidgetCreated::EVENT_TYPE], |h, e| {
            let created: WidgetCreated = e.decode()?;
            tracing::info!(widget_id = %e.aggregate_id, name = %created.name, "widget created");
            h.catalog.insert(e, created.name)
        });
    }
}

/// Handles renames and discontinuations.
#[derive(Debug)]
pub struct WidgetCatalogHandler {
    catalog: WidgetCatalog,
}

impl WidgetCatalogHandler {
    pub fn new(catalog: WidgetCatalog) -> Self {
        Self { catalog }
    }
}

impl EventHandler for WidgetCatalogHandler {
    const NAME: &'static str = "widget_catalog";

    fn register(handlers: &mut Handlers<Self>) {
        handlers
            .on(&[WidgetRenamed::EVENT_TYPE], |h, e| {
                let renamed: WidgetRenamed = e.decode()?;
                h.catalog.update(e, |entry| entry.name = renamed.name)
            })
            .on(&[WidgetDiscontinued::EVENT_TYPE], |h, e| {
                h.catalog.update(e, |entry| entry.discontinued = true)
            });
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use foldwork_events::{HandlerTable, PendingEvent};

    use super::*;

    fn stored<E: DomainEvent>(id: &str, seq: u64, event: &E) -> StoredEvent {
        let pending = PendingEvent::prepare(AggregateId::from(id), "widget", event).unwrap();
        StoredEvent::from_pending(pending, seq, Utc::now())
    }

    fn deliver<H: EventHandler>(handler: &mut H, event: &StoredEvent) -> anyhow::Result<()> {
        let table = HandlerTable::<H>::from_registration(H::NAME, H::register).unwrap();
        (table.get(&event.event_type).unwrap())(handler, event)
    }

    #[test]
    fn created_then_renamed_then_discontinued() {
        let catalog = WidgetCatalog::new();
        let mut created = WidgetCreatedHandler::new(catalog.clone());
        let mut updates = WidgetCatalogHandler::new(catalog.clone());

        deliver(&mut created, &stored("w1", 1, &WidgetCreated { name: "Gear".into() })).unwrap();
        deliver(&mut updates, &stored("w1", 2, &WidgetRenamed { name: "Cog".into() })).unwrap();
        deliver(&mut updates, &stored("w1", 3, &WidgetDiscontinued {})).unwrap();

        let entry = catalog.get(&AggregateId::from("w1")).unwrap();
        assert_eq!(entry.name, "Cog");
        assert!(entry.discontinued);
        assert_eq!(entry.last_sequence, 3);
        assert!(catalog.active().is_empty());
    }

    #[test]
    fn redelivered_events_are_ignored() {
        let catalog = WidgetCatalog::new();
        let mut created = WidgetCreatedHandler::new(catalog.clone());
        let mut updates = WidgetCatalogHandler::new(catalog.clone());

        deliver(&mut created, &stored("w1", 1, &WidgetCreated { name: "Gear".into() })).unwrap();
        deliver(&mut updates, &stored("w1", 2, &WidgetRenamed { name: "Cog".into() })).unwrap();
        // Stale redelivery of the creation must not reset the name.
        deliver(&mut created, &stored("w1", 1, &WidgetCreated { name: "Gear".into() })).unwrap();
        deliver(&mut updates, &stored("w1", 2, &WidgetRenamed { name: "Bolt".into() })).unwrap();

        assert_eq!(catalog.get(&AggregateId::from("w1")).unwrap().name, "Cog");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn update_of_unknown_widget_fails() {
        let catalog = WidgetCatalog::new();
        let mut updates = WidgetCatalogHandler::new(catalog.clone());

        let err = deliver(&mut updates, &stored("ghost", 2, &WidgetDiscontinued {})).unwrap_err();

        assert!(err.to_string().contains("ghost"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn clear_empties_the_catalog() {
        let catalog = WidgetCatalog::new();
        let mut created = WidgetCreatedHandler::new(catalog.clone());
        deliver(&mut created, &stored("w1", 1, &WidgetCreated { name: "Gear".into() })).unwrap();
        deliver(&mut created, &stored("w2", 1, &WidgetCreated { name: "Cog".into() })).unwrap();

        let names: Vec<_> = catalog.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Gear", "Cog"]);

        catalog.clear();
        assert!(catalog.is_empty());
    }
}
