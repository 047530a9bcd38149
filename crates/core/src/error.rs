//! Errors a command handler returns when it refuses a command.
//!
//! Field checks run before dispatch and surface as validation errors, so a
//! `DomainError` always means the handler looked at the current aggregate
//! state and said no. Nothing is recorded when a handler returns one.

use thiserror::Error;

/// Result of a business rule evaluated against loaded aggregate state.
pub type DomainResult<T> = Result<T, DomainError>;

/// Why a command handler rejected a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The command is well formed but not allowed in the current state.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// Applying the command would break an aggregate invariant.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The targeted aggregate has no events.
    #[error("not found")]
    NotFound,

    /// The aggregate already exists, or its version moved.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation(reason.into())
    }

    pub fn invalid_id(reason: impl Into<String>) -> Self {
        Self::InvalidId(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Fail with [`DomainError::Rejected`] unless `condition` holds.
    pub fn ensure(condition: bool, reason: impl Into<String>) -> DomainResult<()> {
        if condition {
            Ok(())
        } else {
            Err(Self::rejected(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_refusals_render_their_reason() {
        assert_eq!(
            DomainError::rejected("deposits are frozen").to_string(),
            "command rejected: deposits are frozen"
        );
        assert_eq!(
            DomainError::invariant("balance below zero").to_string(),
            "invariant violated: balance below zero"
        );
        assert_eq!(
            DomainError::conflict("widget already exists").to_string(),
            "conflict: widget already exists"
        );
        assert_eq!(DomainError::not_found().to_string(), "not found");
    }

    #[test]
    fn ensure_rejects_only_when_the_rule_fails() {
        assert_eq!(DomainError::ensure(true, "unused"), Ok(()));
        assert_eq!(
            DomainError::ensure(false, "account is closed"),
            Err(DomainError::Rejected("account is closed".to_string()))
        );
    }
}
