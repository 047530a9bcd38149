//! Command model: validated, structured intent targeting one aggregate.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use foldwork_core::{AggregateId, ValidationErrors};

/// A command targets a specific aggregate.
///
/// Commands are **transient** (never persisted) and are either rejected by
/// validation or dispatched exactly once to the handler registered for their
/// type.
///
/// ## Lifecycle
///
/// ```text
/// construct ─▶ check() ─▶ CommandDispatcher::execute() ─▶ handler
///                 │
///                 └─ invalid: ExecuteError::Invalid, nothing dispatched
/// ```
pub trait Command: Serialize + Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable command type identifier (e.g. "widget.create").
    const COMMAND_TYPE: &'static str;

    /// Value returned to the caller when the handler succeeds.
    type Output;

    fn aggregate_id(&self) -> &AggregateId;

    /// Declare type-specific rules by recording violations into `errors`.
    fn validate(&self, errors: &mut ValidationErrors);

    /// Run every rule (including the aggregate id requirement).
    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.ensure(
            !self.aggregate_id().as_str().trim().is_empty(),
            "aggregate_id",
            "is required",
        );
        self.validate(&mut errors);
        errors.into_result()
    }

    fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// The declared attributes as a JSON object.
    fn attributes(&self) -> Map<String, JsonValue> {
        match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
