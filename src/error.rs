//! Error taxonomy for the binding engine
//!
//! Every failure surfaced by the manager and the engines is one of these
//! variants; store-level failures are wrapped rather than re-stated.

use crate::store::StoreError;
use thiserror::Error;

/// Binding errors
#[derive(Error, Debug)]
pub enum BindError {
    /// The object graph or target type violates the mapping rules
    /// (unmapped type, inverse property holding a non-resource value,
    /// container semantics on an inverse property, unresolvable id).
    #[error("validation error: {0}")]
    Validation(String),

    /// A resource carries no discoverable bound type during auto-detect get.
    /// The caller must supply an explicit type to recover.
    #[error("cannot detect a bound type for resource {0}")]
    TypeDetection(String),

    /// A value the literal codec, bean-type check and URI check all reject.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// Failure from the underlying triple store connection.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BindError {
    /// Shorthand for a validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        BindError::Validation(msg.into())
    }

    /// Shorthand for an unsupported-value failure
    pub fn unsupported(msg: impl Into<String>) -> Self {
        BindError::UnsupportedValue(msg.into())
    }
}

pub type BindResult<T> = Result<T, BindError>;
