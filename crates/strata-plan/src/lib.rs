//! `Strata` Plan
//!
//! This crate provides the logical plan algebra of the `Strata` query
//! compiler: relational operators, the properties every node derives from
//! its inputs, and the rewriting machinery optimizer rules are built on.
//!
//! # Overview
//!
//! - **Expressions**: [`Expr`] and [`Attribute`], with identity-keyed
//!   [`AttributeSet`] and canonical-keyed [`ExpressionSet`]
//! - **Plans**: [`LogicalPlan`], an operator plus its derived output,
//!   resolution, constraints, row bounds and tree patterns
//! - **Grouping sets**: [`ExpandNode`] planning and grouping-id bitmasks
//! - **Rewriting**: bottom-up and top-down transforms with pattern pruning
//! - **Canonicalization**: [`LogicalPlan::same_result`] for comparing plans
//!   built independently
//!
//! # Example
//!
//! ```
//! use strata_core::DataType;
//! use strata_plan::{Attribute, Expr, LogicalPlan};
//!
//! fn build() -> LogicalPlan {
//!     let a = Attribute::new("a", DataType::Long);
//!     LogicalPlan::local_relation(vec![a.clone()])
//!         .filter(Expr::attr(&a).gt(Expr::lit(0i64)))
//!         .limit(10)
//! }
//!
//! let (one, two) = (build(), build());
//! // fresh column identities, so the plans differ structurally
//! assert_ne!(one, two);
//! // but they compute the same rows
//! assert!(one.same_result(&two));
//! assert_eq!(one.max_rows(), Some(10));
//! ```
//!
//! # Modules
//!
//! - [`expr`] - Expressions, attributes and expression sets
//! - [`plan`] - Plan nodes, derived properties and transforms
//! - [`error`] - Error types ([`PlanError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod expr;
pub mod plan;

// Re-export commonly used types
pub use error::{PlanError, PlanResult};
pub use expr::{Attribute, AttributeSet, Expr, ExpressionSet};
pub use plan::{ExpandNode, JoinType, LogicalPlan, PlanKind, TreePattern};
