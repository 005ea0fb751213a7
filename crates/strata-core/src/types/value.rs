//! Literal values carried by constant expressions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DataType;
use crate::error::{CoreError, CoreResult};

/// A literal payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integral value, wide enough for every integral type.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
}

impl Value {
    /// Returns true if this value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integral payload, if any.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The natural data type of this value.
    #[must_use]
    pub fn natural_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Bool(_) => DataType::Boolean,
            Self::Int(_) => DataType::Long,
            Self::Float(_) => DataType::Double,
            Self::String(_) => DataType::String,
        }
    }

    /// Converts this value to an `i64` the way an implicit cast would.
    ///
    /// Floats are truncated toward zero and strings are parsed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLiteral`] for strings that do not parse as
    /// an integer and [`CoreError::TypeMismatch`] for NULL, booleans and
    /// out-of-range floats.
    pub fn to_i64(&self) -> CoreResult<i64> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Float(v) if v.is_finite() && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
                Ok(v.trunc() as i64)
            }
            Self::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| CoreError::InvalidLiteral(format!("'{s}' is not a valid long"))),
            other => Err(CoreError::type_mismatch_with_value("long", other.natural_type().type_name(), other)),
        }
    }

    /// Renders this value as a SQL literal.
    #[must_use]
    pub fn sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_owned(),
            Self::Bool(b) => if *b { "true" } else { "false" }.to_owned(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "\\'")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}
