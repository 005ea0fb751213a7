//! Fluent plan construction.
//!
//! Each method wraps `self` in one more operator, so a query reads from the
//! relation outwards:
//!
//! ```
//! use strata_core::DataType;
//! use strata_plan::expr::{Attribute, Expr};
//! use strata_plan::plan::LogicalPlan;
//!
//! let id = Attribute::new("id", DataType::Long);
//! let plan = LogicalPlan::local_relation(vec![id.clone()])
//!     .filter(Expr::attr(&id).gt(Expr::lit(10i64)))
//!     .project(vec![Expr::attr(&id)])
//!     .limit(5);
//! assert_eq!(plan.max_rows(), Some(5));
//! ```

use strata_core::Value;

use super::join::{JoinHint, JoinNode, JoinType};
use super::node::{BinaryOperator, LeafOperator, LogicalPlan, NaryOperator, PlanKind, UnaryOperator};
use super::partitioning::RepartitionNode;
use super::range::RangeNode;
use super::relational::{
    AggregateNode, AliasIdentifier, DeduplicateNode, FilterNode, HintInfo, LimitNode, LocalRelationNode,
    OffsetNode, ProjectNode, SampleNode, SetOperationNode, SortNode, SubqueryAliasNode, SubqueryNode,
    UnionNode, UnresolvedRelationNode, WindowNode,
};
use crate::error::PlanResult;
use crate::expr::{Attribute, Expr};

impl LogicalPlan {
    // ========== Leaves ==========

    /// An inline relation with no rows.
    #[must_use]
    pub fn local_relation(output: Vec<Attribute>) -> Self {
        Self::leaf(LeafOperator::LocalRelation(LocalRelationNode::empty(output)))
    }

    /// An inline relation with the given rows.
    #[must_use]
    pub fn values(output: Vec<Attribute>, rows: Vec<Vec<Value>>) -> Self {
        Self::leaf(LeafOperator::LocalRelation(LocalRelationNode::new(output, rows)))
    }

    /// One row, no columns.
    #[must_use]
    pub fn one_row_relation() -> Self {
        Self::leaf(LeafOperator::OneRowRelation)
    }

    /// `range(start, end, step)` with a single `id` column.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`RangeNode::new`].
    pub fn range(start: i64, end: i64, step: i64) -> PlanResult<Self> {
        Ok(Self::leaf(LeafOperator::Range(RangeNode::new(start, end, step, None)?)))
    }

    /// A relation known only by name.
    #[must_use]
    pub fn unresolved_relation(multipart_identifier: Vec<String>) -> Self {
        Self::leaf(LeafOperator::UnresolvedRelation(UnresolvedRelationNode { multipart_identifier }))
    }

    // ========== Unary ==========

    /// Keeps rows satisfying `condition`.
    #[must_use]
    pub fn filter(self, condition: Expr) -> Self {
        Self::unary(UnaryOperator::Filter(FilterNode::new(condition)), self)
    }

    /// Computes `exprs` for every row.
    #[must_use]
    pub fn project(self, exprs: Vec<Expr>) -> Self {
        Self::unary(UnaryOperator::Project(ProjectNode::new(exprs)), self)
    }

    /// Groups by `grouping` and computes `aggregates` per group.
    #[must_use]
    pub fn aggregate(self, grouping: Vec<Expr>, aggregates: Vec<Expr>) -> Self {
        Self::unary(UnaryOperator::Aggregate(AggregateNode::new(grouping, aggregates)), self)
    }

    /// Sorts by `order`, globally or within each partition.
    #[must_use]
    pub fn sort(self, order: Vec<Expr>, global: bool) -> Self {
        Self::unary(UnaryOperator::Sort(SortNode { order, global }), self)
    }

    /// Keeps the first `n` rows: a global limit over a per-partition limit.
    #[must_use]
    pub fn limit(self, n: i64) -> Self {
        let local = self.local_limit(n);
        Self::unary(UnaryOperator::GlobalLimit(LimitNode::new(n)), local)
    }

    /// Keeps the first `n` rows of each partition.
    #[must_use]
    pub fn local_limit(self, n: i64) -> Self {
        Self::unary(UnaryOperator::LocalLimit(LimitNode::new(n)), self)
    }

    /// Keeps the last `n` rows.
    #[must_use]
    pub fn tail(self, n: i64) -> Self {
        Self::unary(UnaryOperator::Tail(LimitNode::new(n)), self)
    }

    /// Skips the first `n` rows.
    #[must_use]
    pub fn offset(self, n: i64) -> Self {
        Self::unary(UnaryOperator::Offset(OffsetNode::new(n)), self)
    }

    /// Removes duplicate rows.
    #[must_use]
    pub fn distinct(self) -> Self {
        Self::unary(UnaryOperator::Distinct, self)
    }

    /// Removes rows with duplicate `keys`.
    #[must_use]
    pub fn deduplicate(self, keys: Vec<Attribute>) -> Self {
        Self::unary(UnaryOperator::Deduplicate(DeduplicateNode { keys }), self)
    }

    /// Names the relation; output columns are qualified with `name`.
    #[must_use]
    pub fn alias(self, name: impl Into<String>) -> Self {
        let identifier = AliasIdentifier::new(name);
        Self::unary(UnaryOperator::SubqueryAlias(SubqueryAliasNode { identifier }), self)
    }

    /// Marks this plan as the root of a subquery.
    #[must_use]
    pub fn subquery(self, correlated: bool) -> Self {
        Self::unary(UnaryOperator::Subquery(SubqueryNode { correlated }), self)
    }

    /// Appends window expressions over one window specification.
    #[must_use]
    pub fn window(self, window_expressions: Vec<Expr>, partition_spec: Vec<Expr>, order_spec: Vec<Expr>) -> Self {
        let node = WindowNode { window_expressions, partition_spec, order_spec };
        Self::unary(UnaryOperator::Window(node), self)
    }

    /// A random sample of the rows in `[lower, upper)`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`SampleNode::new`].
    pub fn sample(self, lower: f64, upper: f64, with_replacement: bool, seed: u64) -> PlanResult<Self> {
        let node = SampleNode::new(lower, upper, with_replacement, seed)?;
        Ok(Self::unary(UnaryOperator::Sample(node), self))
    }

    /// Redistributes rows into `n` partitions.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`RepartitionNode::new`].
    pub fn repartition(self, n: i64, shuffle: bool) -> PlanResult<Self> {
        Ok(Self::unary(UnaryOperator::Repartition(RepartitionNode::new(n, shuffle)?), self))
    }

    /// Attaches a resolved hint.
    #[must_use]
    pub fn hint(self, hint: HintInfo) -> Self {
        Self::unary(UnaryOperator::ResolvedHint(hint), self)
    }

    // ========== Binary ==========

    /// Joins with `right`.
    #[must_use]
    pub fn join(self, right: Self, join_type: JoinType, condition: Option<Expr>) -> Self {
        self.join_with_hint(right, join_type, condition, JoinHint::none())
    }

    /// Joins with `right`, carrying execution hints.
    #[must_use]
    pub fn join_with_hint(self, right: Self, join_type: JoinType, condition: Option<Expr>, hint: JoinHint) -> Self {
        let node = JoinNode::new(join_type, condition).with_hint(hint);
        Self::binary(BinaryOperator::Join(node), self, right)
    }

    /// Rows present in both inputs.
    #[must_use]
    pub fn intersect(self, other: Self, is_all: bool) -> Self {
        Self::binary(BinaryOperator::Intersect(SetOperationNode { is_all }), self, other)
    }

    /// Rows of this input not present in `other`.
    #[must_use]
    pub fn except(self, other: Self, is_all: bool) -> Self {
        Self::binary(BinaryOperator::Except(SetOperationNode { is_all }), self, other)
    }

    // ========== N-ary ==========

    /// Positional UNION ALL of `children`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PlanError::EmptyUnion`] if `children` is empty.
    pub fn union(children: Vec<Self>) -> PlanResult<Self> {
        Self::nary(NaryOperator::Union(UnionNode::default()), children)
    }

    /// Positional UNION ALL of this plan and `other`.
    #[must_use]
    pub fn union_all(self, other: Self) -> Self {
        Self::derive(PlanKind::Nary { op: NaryOperator::Union(UnionNode::default()), children: vec![self, other] })
    }

    /// Scopes `definitions` over this plan, which becomes the main query.
    #[must_use]
    pub fn with_cte(self, definitions: Vec<Self>) -> Self {
        let mut children = definitions;
        children.push(self);
        Self::derive(PlanKind::Nary { op: NaryOperator::WithCte, children })
    }
}
