//! Core data types for `Strata`.
//!
//! This module defines the column-level building blocks that the plan
//! algebra treats as opaque: identities, data types and literal values.

mod data_type;
mod id;
mod value;


pub use data_type::{DataType, StructField};
pub use id::ExprId;
pub use value::Value;
