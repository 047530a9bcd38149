//! Event-sourced aggregates.

use foldwork_core::{AggregateId, AggregateRoot};
use foldwork_events::Handlers;

/// An aggregate whose state is built only by folding its events.
///
/// Implementations register one fold callback per event type they accept:
///
/// ```ignore
/// impl Aggregate for Widget {
///     const AGGREGATE_TYPE: &'static str = "widget";
///
///     fn empty(id: AggregateId) -> Self { /* fresh, not yet created */ }
///
///     fn register(handlers: &mut Handlers<Self>) {
///         handlers.on(&[WidgetCreated::EVENT_TYPE, WidgetRenamed::EVENT_TYPE], |w, e| {
///             w.name = e.payload["name"].as_str().unwrap_or_default().to_string();
///             Ok(())
///         });
///     }
///
///     fn set_version(&mut self, version: u64) { self.version = version; }
/// }
/// ```
///
/// Fold callbacks must be deterministic and side-effect free: replaying the
/// same events always produces the same state.
pub trait Aggregate: AggregateRoot<Id = AggregateId> + Sized + Send + 'static {
    /// Stable aggregate type identifier (e.g. "widget").
    const AGGREGATE_TYPE: &'static str;

    /// A fresh instance that has not folded any event yet.
    fn empty(id: AggregateId) -> Self;

    /// Register fold callbacks.
    fn register(handlers: &mut Handlers<Self>);

    /// Record the sequence number of the last folded event.
    fn set_version(&mut self, version: u64);
}
