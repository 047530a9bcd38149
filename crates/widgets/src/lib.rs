//! Widget domain module (event-sourced).
//!
//! A small catalog of named widgets: created once, renamed while active,
//! discontinued for good. Business rules live in the command handlers; the
//! `Widget` aggregate only folds events.

pub mod catalog;
pub mod commands;
pub mod widget;

pub use catalog::{CatalogEntry, WidgetCatalog, WidgetCatalogHandler, WidgetCreatedHandler};
pub use commands::{
    CreateWidget, CreateWidgetHandler, DiscontinueWidget, DiscontinueWidgetHandler, MAX_NAME_LEN,
    RenameWidget, RenameWidgetHandler,
};
pub use widget::{Widget, WidgetCreated, WidgetDiscontinued, WidgetRenamed};

use foldwork_infra::{Registry, RegistryError};

/// Wire the widget aggregate, events, event handlers and command handlers.
///
/// Both event handlers write to `catalog`.
pub fn registry(catalog: &WidgetCatalog) -> Result<Registry, RegistryError> {
    let created = catalog.clone();
    let updates = catalog.clone();

    Registry::builder()
        .aggregate::<Widget>()
        .event::<WidgetCreated>()
        .event::<WidgetRenamed>()
        .event::<WidgetDiscontinued>()
        .event_handler(move || WidgetCreatedHandler::new(created.clone()))
        .event_handler(move || WidgetCatalogHandler::new(updates.clone()))
        .command::<CreateWidgetHandler>()
        .command::<RenameWidgetHandler>()
        .command::<DiscontinueWidgetHandler>()
        .build()
}
