//! Logical query plan.
//!
//! A logical plan is a tree of relational operators describing *what* a
//! query computes. Every node carries properties derived from its operator
//! and children when it is built: output schema, resolution, inferred
//! constraints, row-count bounds and tree-pattern bits.
//!
//! # Operators
//!
//! - **Leaves**: `LocalRelation`, `OneRowRelation`, `Range`, CTE references
//! - **Unary**: `Project`, `Filter`, `Aggregate`, `Window`, `Expand`, limits,
//!   aliases, sampling, repartitioning and the rest of [`UnaryOperator`]
//! - **Binary**: `Join`, `Intersect`, `Except`
//! - **N-ary**: `Union`, `WithCte`
//!
//! # Example
//!
//! ```
//! use strata_core::DataType;
//! use strata_plan::expr::{Attribute, Expr};
//! use strata_plan::plan::{JoinType, LogicalPlan};
//!
//! let a = Attribute::new("a", DataType::Long);
//! let b = Attribute::new("b", DataType::Long);
//! let left = LogicalPlan::local_relation(vec![a.clone()]);
//! let right = LogicalPlan::local_relation(vec![b.clone()]);
//!
//! // SELECT * FROM l JOIN r ON a = b WHERE a > 1
//! let plan = left
//!     .join(right, JoinType::Inner, Some(Expr::attr(&a).eq(Expr::attr(&b))))
//!     .filter(Expr::attr(&a).gt(Expr::lit(1i64)));
//!
//! assert!(plan.resolved());
//! assert_eq!(plan.output().len(), 2);
//! assert!(plan.constraints().contains(&Expr::attr(&a).is_not_null()));
//! ```

mod builder;
mod canonicalize;
mod constraints;
mod grouping;
mod join;
mod node;
mod output;
mod partitioning;
mod patterns;
mod range;
mod relational;
mod resolution;
mod row_bounds;
mod tags;
mod transform;
mod view;


pub use constraints::rewrite_constraints;
pub use grouping::{
    build_bitmask, cube_exprs, grouping_id_attribute, rollup_exprs, ExpandNode, GroupingSetsNode,
    GROUPING_ID_NAME, GROUPING_POSITION_NAME,
};
pub use join::{JoinHint, JoinNode, JoinType};
pub use node::{BinaryOperator, DisplayTree, LeafOperator, LogicalPlan, NaryOperator, PlanKind, UnaryOperator};
pub use partitioning::{Partitioning, RepartitionByExpressionNode, RepartitionNode};
pub use patterns::{TreePattern, TreePatternBits};
pub use range::{ColumnStat, RangeNode, Statistics};
pub use relational::{
    AggregateNode, AliasIdentifier, CollectMetricsNode, CteRelationDefNode, CteRelationRefNode, DeduplicateNode,
    FilterNode, GenerateNode, HintInfo, InsertIntoDirNode, LimitNode, LocalRelationNode, OffsetNode, PivotNode,
    ProjectNode, SampleNode, SetOperationNode, SortNode, SubqueryAliasNode, SubqueryNode, UnionNode,
    UnresolvedRelationNode, WindowNode, SAMPLE_ROUNDING_EPSILON,
};
pub use tags::TagStore;
pub use view::{CatalogTable, ViewNode};
