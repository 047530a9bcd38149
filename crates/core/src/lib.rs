//! `foldwork-core`: building blocks shared by every layer of the runtime.
//!
//! This crate contains **pure domain** primitives (no storage, no dispatch).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod validation;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::AggregateId;
pub use validation::{FieldError, ValidationErrors};
