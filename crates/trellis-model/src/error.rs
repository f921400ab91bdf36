#![forbid(unsafe_code)]

//! Failure taxonomy for property lookup and assignment.

use thiserror::Error;

use crate::value::PropertyType;

/// Errors raised by property access on a [`Model`](crate::Model).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The model declares no property under this name.
    #[error("model `{model}` has no property `{property}`")]
    UnknownProperty { model: String, property: String },

    /// The assigned value does not satisfy the property's declared type.
    #[error("property `{property}` expects {expected}, got {got}")]
    TypeMismatch {
        property: String,
        expected: PropertyType,
        got: &'static str,
    },

    /// The property's custom validator rejected the value.
    #[error("property `{property}` rejected value: {reason}")]
    ValidationFailed { property: String, reason: String },
}
