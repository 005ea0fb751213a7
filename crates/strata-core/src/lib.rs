//! `Strata` Core
//!
//! This crate provides the value-level types shared by every layer of the
//! `Strata` query compiler.
//!
//! # Overview
//!
//! - **Identifiers**: [`ExprId`] tokens that give every column slot a global identity
//! - **Data types**: [`DataType`] with the widening and cast rules the planner relies on
//! - **Values**: [`Value`] literal payloads carried by constant expressions
//! - **Configuration**: [`SessionConfig`] options read while building plans
//!
//! # Example
//!
//! ```
//! use strata_core::{DataType, ExprId, SessionConfig, Value};
//!
//! let a = ExprId::next();
//! let b = ExprId::next();
//! assert_ne!(a, b);
//!
//! assert!(DataType::Integer.is_integral());
//! assert_eq!(DataType::Long.default_size(), 8);
//! assert_eq!(Value::from(7i64).as_int(), Some(7));
//!
//! let config = SessionConfig::default();
//! assert_eq!(config.num_shuffle_partitions, 200);
//! ```
//!
//! # Modules
//!
//! - [`types`] - Data types, values and identifiers
//! - [`config`] - Session configuration ([`SessionConfig`])
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::SessionConfig;
pub use error::{CoreError, CoreResult};
pub use types::{DataType, ExprId, StructField, Value};
