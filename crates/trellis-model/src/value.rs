#![forbid(unsafe_code)]

//! Dynamically typed property values.
//!
//! Every model property holds a [`Value`] and declares a [`PropertyType`].
//! Assignment type-checks the incoming value against the declared type and
//! then consults the property's optional custom validator.
//!
//! # Invariants
//!
//! 1. The only implicit widening is `Int` into a `Float` property; no other
//!    cross-acceptance exists.
//! 2. `Null` satisfies only `Any`.
//! 3. A custom validator runs after the type check, never instead of it.

use std::fmt;
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the value's runtime kind, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// Declared type of a model property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyType {
    Any,
    Bool,
    Int,
    Float,
    Str,
    List,
}

impl PropertyType {
    /// Whether `value` satisfies this type.
    #[must_use]
    pub fn check(self, value: &Value) -> bool {
        match (self, value) {
            (PropertyType::Any, _) => true,
            (PropertyType::Bool, Value::Bool(_)) => true,
            (PropertyType::Int, Value::Int(_)) => true,
            // Int widens into Float properties.
            (PropertyType::Float, Value::Float(_) | Value::Int(_)) => true,
            (PropertyType::Str, Value::Str(_)) => true,
            (PropertyType::List, Value::List(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Any => "any",
            PropertyType::Bool => "bool",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Str => "str",
            PropertyType::List => "list",
        };
        f.write_str(name)
    }
}

/// Custom validator consulted after the type check.
pub type Validator = Rc<dyn Fn(&Value) -> Result<(), String>>;

/// Descriptor for a declared property: type, default value, optional
/// validator.
#[derive(Clone)]
pub struct Property {
    ty: PropertyType,
    default: Value,
    validator: Option<Validator>,
}

impl Property {
    #[must_use]
    pub fn new(ty: PropertyType, default: Value) -> Self {
        Self {
            ty,
            default,
            validator: None,
        }
    }

    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&Value) -> Result<(), String> + 'static,
    ) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    #[must_use]
    pub fn ty(&self) -> PropertyType {
        self.ty
    }

    #[must_use]
    pub fn default(&self) -> &Value {
        &self.default
    }

    #[must_use]
    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("ty", &self.ty)
            .field("default", &self.default)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
