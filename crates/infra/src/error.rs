//! Errors surfaced by the command pipeline and the replay engine.

use thiserror::Error;

use foldwork_core::{DomainError, ValidationErrors};
use foldwork_events::{EnvelopeError, PublishError, StoredEvent};

use crate::event_store::EventStoreError;

/// Which lookup failed to find a handler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    /// Command type -> command handler.
    Command,
    /// Event type -> aggregate fold callback.
    Apply,
    /// Event type -> event handler callback.
    Publish,
}

impl core::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            HandlerKind::Command => "command",
            HandlerKind::Apply => "apply",
            HandlerKind::Publish => "publish",
        })
    }
}

/// A type has no registered handler. Always a wiring bug, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no {kind} handler for '{key}' in '{scope}'")]
pub struct HandlerNotFound {
    pub kind: HandlerKind,
    /// Where the lookup happened (aggregate type, handler name or registry).
    pub scope: String,
    /// The type name that could not be resolved.
    pub key: String,
}

impl HandlerNotFound {
    pub fn new(kind: HandlerKind, scope: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind,
            scope: scope.into(),
            key: key.into(),
        }
    }
}

/// Command execution error.
///
/// ## Partial application
///
/// Events are appended one at a time. When a command records several events
/// and a later step fails, the events already appended stay durable; nothing
/// is rolled back.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The command failed validation and was never dispatched.
    #[error("invalid command: {0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    HandlerNotFound(#[from] HandlerNotFound),

    /// A business rule rejected the command.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The event store could not persist or load events.
    #[error("event store failure: {0}")]
    Store(#[from] EventStoreError),

    /// The event is stored, but its handler failed.
    #[error("event stored but publication failed: {source}")]
    Publish {
        event: Box<StoredEvent>,
        #[source]
        source: PublishError,
    },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// An aggregate's fold callback rejected an event.
    #[error("'{aggregate_type}' failed to fold '{event_type}': {source}")]
    Fold {
        aggregate_type: &'static str,
        event_type: String,
        #[source]
        source: anyhow::Error,
    },

    /// A loaded stream violates ordering or scoping guarantees.
    #[error("corrupt event stream: {0}")]
    Stream(String),
}

impl ExecuteError {
    pub fn is_invalid(&self) -> bool {
        matches!(self, ExecuteError::Invalid(_))
    }

    /// Field-level detail when validation failed.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ExecuteError::Invalid(errors) => Some(errors),
            _ => None,
        }
    }

    pub(crate) fn from_publish(event: StoredEvent, err: PublishError) -> Self {
        match err {
            PublishError::HandlerNotFound {
                event_type,
                handler,
            } => ExecuteError::HandlerNotFound(HandlerNotFound::new(
                HandlerKind::Publish,
                handler.unwrap_or("event handler registry"),
                event_type,
            )),
            source @ PublishError::Handler { .. } => ExecuteError::Publish {
                event: Box::new(event),
                source,
            },
        }
    }
}
