use serde::{Deserialize, Serialize};

use foldwork_core::{AggregateId, AggregateRoot, DomainError};
use foldwork_events::{DomainEvent, Handlers};
use foldwork_infra::Aggregate;

use crate::catalog::{WidgetCatalogHandler, WidgetCreatedHandler};

/// Aggregate root: Widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    id: AggregateId,
    name: String,
    created: bool,
    discontinued: bool,
    renames: u32,
    version: u64,
}

impl Widget {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn is_discontinued(&self) -> bool {
        self.discontinued
    }

    /// Number of renames since creation.
    pub fn renames(&self) -> u32 {
        self.renames
    }

    pub(crate) fn ensure_absent(&self) -> Result<(), DomainError> {
        if self.created {
            return Err(DomainError::conflict("widget already exists"));
        }
        Ok(())
    }

    pub(crate) fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.discontinued {
            return Err(DomainError::invariant("widget is discontinued"));
        }
        Ok(())
    }
}

impl AggregateRoot for Widget {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Widget {
    const AGGREGATE_TYPE: &'static str = "widget";

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            name: String::new(),
            created: false,
            discontinued: false,
            renames: 0,
            version: 0,
        }
    }

    fn register(handlers: &mut Handlers<Self>) {
        handlers
            .on(&[WidgetCreated::EVENT_TYPE], |widget, e| {
                let created: WidgetCreated = e.decode()?;
                widget.name = created.name;
                widget.created = true;
                Ok(())
            })
            .on(&[WidgetRenamed::EVENT_TYPE], |widget, e| {
                let renamed: WidgetRenamed = e.decode()?;
                widget.name = renamed.name;
                widget.renames += 1;
                Ok(())
            })
            .on(&[WidgetDiscontinued::EVENT_TYPE], |widget, _| {
                widget.discontinued = true;
                Ok(())
            });
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Event: WidgetCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetCreated {
    pub name: String,
}

impl DomainEvent for WidgetCreated {
    const EVENT_TYPE: &'static str = "widget.created";
    type Handler = WidgetCreatedHandler;
}

/// Event: WidgetRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetRenamed {
    pub name: String,
}

impl DomainEvent for WidgetRenamed {
    const EVENT_TYPE: &'static str = "widget.renamed";
    type Handler = WidgetCatalogHandler;
}

/// Event: WidgetDiscontinued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetDiscontinued {}

impl DomainEvent for WidgetDiscontinued {
    const EVENT_TYPE: &'static str = "widget.discontinued";
    type Handler = WidgetCatalogHandler;
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use foldwork_events::{HandlerTable, PendingEvent, StoredEvent};

    use super::*;

    fn stored<E: DomainEvent>(seq: u64, event: &E) -> StoredEvent {
        let pending = PendingEvent::prepare(AggregateId::from("w1"), "widget", event).unwrap();
        StoredEvent::from_pending(pending, seq, Utc::now())
    }

    fn fold(events: &[StoredEvent]) -> Widget {
        let table = HandlerTable::<Widget>::from_registration(
            Widget::AGGREGATE_TYPE,
            Widget::register,
        )
        .unwrap();
        let mut widget = Widget::empty(AggregateId::from("w1"));
        for e in events {
            (table.get(&e.event_type).unwrap())(&mut widget, e).unwrap();
            widget.set_version(e.sequence_number);
        }
        widget
    }

    #[test]
    fn folds_the_full_lifecycle() {
        let widget = fold(&[
            stored(1, &WidgetCreated { name: "Gear".into() }),
            stored(2, &WidgetRenamed { name: "Cog".into() }),
            stored(3, &WidgetDiscontinued {}),
        ]);

        assert!(widget.exists());
        assert_eq!(widget.name(), "Cog");
        assert_eq!(widget.renames(), 1);
        assert!(widget.is_discontinued());
        assert_eq!(widget.version(), 3);
    }

    #[test]
    fn business_rules_follow_state() {
        let empty = Widget::empty(AggregateId::from("w1"));
        assert!(empty.ensure_absent().is_ok());
        assert_eq!(empty.ensure_active(), Err(DomainError::NotFound));

        let gone = fold(&[
            stored(1, &WidgetCreated { name: "Gear".into() }),
            stored(2, &WidgetDiscontinued {}),
        ]);
        assert!(matches!(gone.ensure_absent(), Err(DomainError::Conflict(_))));
        assert!(matches!(
            gone.ensure_active(),
            Err(DomainError::InvariantViolation(_))
        ));
    }
}
