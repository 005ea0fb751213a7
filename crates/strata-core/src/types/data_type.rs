//! Data types used by the planner's type system.
//!
//! The planner treats types as opaque except for three questions: how wide
//! a value is ([`DataType::default_size`]), whether two types line up for a
//! set operation ([`DataType::same_type`], [`DataType::equals_structurally`]),
//! and how two column types combine when the rows of several inputs flow into
//! one output column ([`DataType::union_like_merge`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A column data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of the untyped NULL literal.
    Null,
    /// Boolean type.
    Boolean,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Fixed precision decimal.
    Decimal {
        /// Total digits.
        precision: u8,
        /// Digits after decimal point.
        scale: u8,
    },
    /// UTF-8 string.
    String,
    /// Binary data.
    Binary,
    /// Date.
    Date,
    /// Timestamp.
    Timestamp,
    /// Array of another type.
    Array {
        /// Element type.
        element: Box<DataType>,
        /// Whether elements may be NULL.
        contains_null: bool,
    },
    /// Map from keys to values.
    Map {
        /// Key type.
        key: Box<DataType>,
        /// Value type.
        value: Box<DataType>,
        /// Whether values may be NULL.
        value_contains_null: bool,
    },
    /// Struct with named fields.
    Struct(Vec<StructField>),
}

/// A named field of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    /// Field name.
    pub name: String,
    /// Field type.
    pub data_type: DataType,
    /// Whether the field may be NULL.
    pub nullable: bool,
}

impl StructField {
    /// Creates a new nullable field.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self { name: name.into(), data_type, nullable: true }
    }

    /// Sets the nullability of this field.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

impl DataType {
    /// Creates an array type.
    #[must_use]
    pub fn array(element: DataType, contains_null: bool) -> Self {
        Self::Array { element: Box::new(element), contains_null }
    }

    /// Creates a map type.
    #[must_use]
    pub fn map(key: DataType, value: DataType, value_contains_null: bool) -> Self {
        Self::Map { key: Box::new(key), value: Box::new(value), value_contains_null }
    }

    /// Returns true if this type is numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integral() || matches!(self, Self::Float | Self::Double | Self::Decimal { .. })
    }

    /// Returns true if this type is an integral numeric type.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Integer | Self::Long)
    }

    /// The default size of a value of this type in bytes.
    ///
    /// Used for size estimation; not a storage layout.
    #[must_use]
    pub fn default_size(&self) -> usize {
        match self {
            Self::Null | Self::Boolean | Self::Byte => 1,
            Self::Short => 2,
            Self::Integer | Self::Float | Self::Date => 4,
            Self::Long | Self::Double | Self::Timestamp => 8,
            Self::Decimal { precision, .. } => {
                if *precision <= 18 {
                    8
                } else {
                    16
                }
            }
            Self::String => 20,
            Self::Binary => 100,
            Self::Array { element, .. } => element.default_size(),
            Self::Map { key, value, .. } => key.default_size() + value.default_size(),
            Self::Struct(fields) => fields.iter().map(|f| f.data_type.default_size()).sum(),
        }
    }

    /// The lower-case name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "void",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal { .. } => "decimal",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Struct(_) => "struct",
        }
    }

    /// Returns true if both types are equal ignoring nullability flags.
    ///
    /// Struct field names are compared case-insensitively.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Array { element: l, .. },
                Self::Array { element: r, .. },
            ) => l.same_type(r),
            (
                Self::Map { key: lk, value: lv, .. },
                Self::Map { key: rk, value: rv, .. },
            ) => lk.same_type(rk) && lv.same_type(rv),
            (Self::Struct(l), Self::Struct(r)) => {
                l.len() == r.len()
                    && l.iter().zip(r).all(|(lf, rf)| {
                        lf.name.eq_ignore_ascii_case(&rf.name) && lf.data_type.same_type(&rf.data_type)
                    })
            }
            (l, r) => l == r,
        }
    }

    /// Returns true if both types have the same shape, ignoring nullability
    /// flags and struct field names.
    #[must_use]
    pub fn equals_structurally(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Array { element: l, .. },
                Self::Array { element: r, .. },
            ) => l.equals_structurally(r),
            (
                Self::Map { key: lk, value: lv, .. },
                Self::Map { key: rk, value: rv, .. },
            ) => lk.equals_structurally(rk) && lv.equals_structurally(rv),
            (Self::Struct(l), Self::Struct(r)) => {
                l.len() == r.len()
                    && l.iter().zip(r).all(|(lf, rf)| lf.data_type.equals_structurally(&rf.data_type))
            }
            (l, r) => l == r,
        }
    }

    /// Merges the nested nullability of two types of the same shape.
    ///
    /// Nested `contains_null`, `value_contains_null` and struct field
    /// `nullable` flags become true if they are true on either side. Field
    /// names and everything else come from `self`. When the shapes do not
    /// line up, `self` is returned unchanged.
    #[must_use]
    pub fn union_like_merge(&self, other: &Self) -> Self {
        match (self, other) {
            (
                Self::Array { element: l, contains_null: lc },
                Self::Array { element: r, contains_null: rc },
            ) => Self::Array { element: Box::new(l.union_like_merge(r)), contains_null: *lc || *rc },
            (
                Self::Map { key: lk, value: lv, value_contains_null: lc },
                Self::Map { key: rk, value: rv, value_contains_null: rc },
            ) => Self::Map {
                key: Box::new(lk.union_like_merge(rk)),
                value: Box::new(lv.union_like_merge(rv)),
                value_contains_null: *lc || *rc,
            },
            (Self::Struct(l), Self::Struct(r)) if l.len() == r.len() => Self::Struct(
                l.iter()
                    .zip(r)
                    .map(|(lf, rf)| StructField {
                        name: lf.name.clone(),
                        data_type: lf.data_type.union_like_merge(&rf.data_type),
                        nullable: lf.nullable || rf.nullable,
                    })
                    .collect(),
            ),
            _ => self.clone(),
        }
    }

    /// Returns true if a value of type `self` may be implicitly cast to `target`.
    ///
    /// In ANSI mode only integral (or NULL) sources may flow into integral
    /// targets, and any numeric source may flow into a fractional target.
    /// Permissive mode additionally accepts every numeric and string source
    /// for a numeric target.
    #[must_use]
    pub fn can_implicit_cast(&self, target: &Self, ansi: bool) -> bool {
        if self == target || matches!(self, Self::Null) {
            return true;
        }
        if !target.is_numeric() {
            return false;
        }
        if ansi {
            if target.is_integral() {
                self.is_integral()
            } else {
                self.is_numeric()
            }
        } else {
            self.is_numeric() || matches!(self, Self::String)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "VOID"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Byte => write!(f, "TINYINT"),
            Self::Short => write!(f, "SMALLINT"),
            Self::Integer => write!(f, "INT"),
            Self::Long => write!(f, "BIGINT"),
            Self::Float => write!(f, "FLOAT"),
            Self::Double => write!(f, "DOUBLE"),
            Self::Decimal { precision, scale } => write!(f, "DECIMAL({precision}, {scale})"),
            Self::String => write!(f, "STRING"),
            Self::Binary => write!(f, "BINARY"),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Array { element, .. } => write!(f, "ARRAY<{element}>"),
            Self::Map { key, value, .. } => write!(f, "MAP<{key}, {value}>"),
            Self::Struct(fields) => {
                write!(f, "STRUCT<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
        }
    }
}
