//! Logical plan node.
//!
//! A [`LogicalPlan`] is an operator ([`PlanKind`]) together with the
//! properties derived from it: output schema, resolution, constraints, row
//! bounds and tree patterns. Derivation happens once, in the constructor, so
//! every accessor is a plain field read and a plan can be shared across
//! threads without synchronization.

// Allow matching arms with identical bodies - intentional for grouping
#![allow(clippy::match_same_arms)]
// Allow long Display impl
#![allow(clippy::too_many_lines)]
// Allow missing_const_for_fn - const fn with Vec isn't stable
#![allow(clippy::missing_const_for_fn)]

use std::fmt;

use super::constraints;
use super::grouping::{ExpandNode, GroupingSetsNode};
use super::join::JoinNode;
use super::output;
use super::partitioning::{RepartitionByExpressionNode, RepartitionNode};
use super::patterns::{TreePattern, TreePatternBits};
use super::range::RangeNode;
use super::relational::{
    AggregateNode, CollectMetricsNode, CteRelationDefNode, CteRelationRefNode, DeduplicateNode, FilterNode,
    GenerateNode, HintInfo, InsertIntoDirNode, LimitNode, LocalRelationNode, OffsetNode, PivotNode,
    ProjectNode, SampleNode, SetOperationNode, SortNode, SubqueryAliasNode, SubqueryNode, UnionNode,
    UnresolvedRelationNode, WindowNode,
};
use super::resolution;
use super::row_bounds;
use super::tags::TagStore;
use super::view::ViewNode;
use crate::error::{PlanError, PlanResult};
use crate::expr::{Attribute, AttributeSet, Expr, ExpressionSet};

// ========== Operators ==========

/// Operators without inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafOperator {
    /// Inline rows.
    LocalRelation(LocalRelationNode),
    /// Exactly one row with no columns.
    OneRowRelation,
    /// A numeric range.
    Range(RangeNode),
    /// A reference to a CTE definition.
    CteRelationRef(CteRelationRefNode),
    /// A relation name not yet looked up.
    UnresolvedRelation(UnresolvedRelationNode),
}

/// Operators with one input.
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOperator {
    /// Projection.
    Project(ProjectNode),
    /// Selection.
    Filter(FilterNode),
    /// Generator application (boxed - carries two lists).
    Generate(Box<GenerateNode>),
    /// Sort.
    Sort(SortNode),
    /// Limit over all partitions.
    GlobalLimit(LimitNode),
    /// Limit within each partition.
    LocalLimit(LimitNode),
    /// Last rows.
    Tail(LimitNode),
    /// Skip leading rows.
    Offset(OffsetNode),
    /// Root of a subquery.
    Subquery(SubqueryNode),
    /// Relation alias.
    SubqueryAlias(SubqueryAliasNode),
    /// Grouped aggregation.
    Aggregate(AggregateNode),
    /// Window functions.
    Window(WindowNode),
    /// Grouping-set expansion.
    Expand(ExpandNode),
    /// Grouping sets awaiting expansion.
    GroupingSets(GroupingSetsNode),
    /// Pivot awaiting rewrite (boxed - carries four lists).
    Pivot(Box<PivotNode>),
    /// Duplicate elimination over all columns.
    Distinct,
    /// Duplicate elimination by key columns.
    Deduplicate(DeduplicateNode),
    /// Random sample.
    Sample(SampleNode),
    /// Repartition by count.
    Repartition(RepartitionNode),
    /// Repartition by expressions.
    RepartitionByExpression(RepartitionByExpressionNode),
    /// A view over its definition.
    View(ViewNode),
    /// A CTE definition.
    CteRelationDef(CteRelationDefNode),
    /// Metric collection.
    CollectMetrics(CollectMetricsNode),
    /// Directory sink awaiting rewrite.
    InsertIntoDir(InsertIntoDirNode),
    /// A resolved hint on the subtree.
    ResolvedHint(HintInfo),
}

/// Operators with two inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOperator {
    /// Join.
    Join(JoinNode),
    /// INTERSECT.
    Intersect(SetOperationNode),
    /// EXCEPT.
    Except(SetOperationNode),
}

/// Operators with any number of inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum NaryOperator {
    /// UNION of all inputs.
    Union(UnionNode),
    /// CTE scope: definitions first, the main query last.
    WithCte,
}

/// An operator and its children, tagged by arity.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
    /// No inputs.
    Leaf(LeafOperator),
    /// One input.
    Unary {
        /// The operator.
        op: UnaryOperator,
        /// The input plan.
        child: Box<LogicalPlan>,
    },
    /// Two inputs.
    Binary {
        /// The operator.
        op: BinaryOperator,
        /// The left input.
        left: Box<LogicalPlan>,
        /// The right input.
        right: Box<LogicalPlan>,
    },
    /// Any number of inputs.
    Nary {
        /// The operator.
        op: NaryOperator,
        /// The input plans.
        children: Vec<LogicalPlan>,
    },
}

// ========== Derived properties ==========

#[derive(Debug, Clone)]
struct Derived {
    output: Vec<Attribute>,
    output_set: AttributeSet,
    resolved: bool,
    valid_constraints: ExpressionSet,
    constraints: ExpressionSet,
    max_rows: Option<u64>,
    max_rows_per_partition: Option<u64>,
    node_patterns: TreePatternBits,
    tree_patterns: TreePatternBits,
}

/// A logical query plan.
///
/// Equality compares operators and children only; tags are ignored.
#[derive(Debug, Clone)]
pub struct LogicalPlan {
    kind: PlanKind,
    props: Derived,
    tags: TagStore,
}

impl PartialEq for LogicalPlan {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl LogicalPlan {
    // ========== Construction ==========

    /// Creates a plan from an operator and its children.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::EmptyUnion`] for a union without children and
    /// [`PlanError::ChildCountMismatch`] for a CTE scope without a main query.
    pub fn new(kind: PlanKind) -> PlanResult<Self> {
        if let PlanKind::Nary { op, children } = &kind {
            if children.is_empty() {
                return Err(match op {
                    NaryOperator::Union(_) => PlanError::EmptyUnion,
                    NaryOperator::WithCte => {
                        PlanError::ChildCountMismatch { operator: "WithCte", expected: 1, actual: 0 }
                    }
                });
            }
        }
        Ok(Self::derive(kind))
    }

    /// Creates a leaf plan.
    #[must_use]
    pub fn leaf(op: LeafOperator) -> Self {
        Self::derive(PlanKind::Leaf(op))
    }

    /// Creates a plan with one input.
    #[must_use]
    pub fn unary(op: UnaryOperator, child: Self) -> Self {
        Self::derive(PlanKind::Unary { op, child: Box::new(child) })
    }

    /// Creates a plan with two inputs.
    #[must_use]
    pub fn binary(op: BinaryOperator, left: Self, right: Self) -> Self {
        Self::derive(PlanKind::Binary { op, left: Box::new(left), right: Box::new(right) })
    }

    /// Creates a plan with any number of inputs.
    ///
    /// # Errors
    ///
    /// See [`LogicalPlan::new`].
    pub fn nary(op: NaryOperator, children: Vec<Self>) -> PlanResult<Self> {
        Self::new(PlanKind::Nary { op, children })
    }

    /// Computes every derived property. Infallible: preconditions are
    /// checked by the node constructors and [`LogicalPlan::new`].
    pub(crate) fn derive(kind: PlanKind) -> Self {
        let output = output::output(&kind);
        let output_set: AttributeSet = output.iter().collect();
        let resolved = resolution::resolved(&kind);
        let valid_constraints = constraints::valid_constraints(&kind);
        let constraints = constraints::finalize(&valid_constraints, &output, &output_set);
        let (max_rows, max_rows_per_partition) = row_bounds::bounds(&kind);
        let node_patterns = node_patterns(&kind);
        let mut tree_patterns = node_patterns;
        for child in kind_children(&kind) {
            tree_patterns = tree_patterns.union(child.tree_patterns());
        }
        for expr in operator_expressions(&kind) {
            tree_patterns = tree_patterns.union(expr.patterns());
        }
        let props = Derived {
            output,
            output_set,
            resolved,
            valid_constraints,
            constraints,
            max_rows,
            max_rows_per_partition,
            node_patterns,
            tree_patterns,
        };
        Self { kind, props, tags: TagStore::new() }
    }

    // ========== Accessors ==========

    /// The operator and its children.
    #[must_use]
    pub fn kind(&self) -> &PlanKind {
        &self.kind
    }

    /// Consumes the plan, returning its operator and children.
    #[must_use]
    pub fn into_kind(self) -> PlanKind {
        self.kind
    }

    /// The children of this plan node, in order.
    #[must_use]
    pub fn children(&self) -> Vec<&LogicalPlan> {
        kind_children(&self.kind)
    }

    /// Returns true if this node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PlanKind::Leaf(_))
    }

    /// The output columns.
    #[must_use]
    pub fn output(&self) -> &[Attribute] {
        &self.props.output
    }

    /// The output columns as an identity set.
    #[must_use]
    pub fn output_set(&self) -> &AttributeSet {
        &self.props.output_set
    }

    /// Whether this node and its whole subtree are fully analyzed.
    #[must_use]
    pub fn resolved(&self) -> bool {
        self.props.resolved
    }

    /// Returns true if every child is resolved.
    #[must_use]
    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    /// Constraints this operator establishes, before inference and pruning.
    #[must_use]
    pub fn valid_constraints(&self) -> &ExpressionSet {
        &self.props.valid_constraints
    }

    /// Predicates that hold for every output row.
    #[must_use]
    pub fn constraints(&self) -> &ExpressionSet {
        &self.props.constraints
    }

    /// Upper bound on output rows.
    #[must_use]
    pub fn max_rows(&self) -> Option<u64> {
        self.props.max_rows
    }

    /// Upper bound on output rows of any one partition.
    #[must_use]
    pub fn max_rows_per_partition(&self) -> Option<u64> {
        self.props.max_rows_per_partition
    }

    /// Patterns of this node alone.
    #[must_use]
    pub fn node_patterns(&self) -> TreePatternBits {
        self.props.node_patterns
    }

    /// Patterns of this node, its expressions and its whole subtree.
    #[must_use]
    pub fn tree_patterns(&self) -> TreePatternBits {
        self.props.tree_patterns
    }

    /// Returns true if the pattern occurs anywhere in this subtree.
    #[must_use]
    pub fn contains_pattern(&self, pattern: TreePattern) -> bool {
        self.props.tree_patterns.contains(pattern)
    }

    /// The expressions this operator holds, excluding stored attribute lists.
    #[must_use]
    pub fn expressions(&self) -> Vec<&Expr> {
        operator_expressions(&self.kind)
    }

    /// Attributes this node reads from its children.
    #[must_use]
    pub fn references(&self) -> AttributeSet {
        let mut refs = AttributeSet::new();
        for expr in self.expressions() {
            refs.extend(expr.references());
        }
        if let PlanKind::Unary { op: UnaryOperator::Deduplicate(node), .. } = &self.kind {
            refs.extend(node.keys.iter().cloned());
        }
        refs.difference(&self.produced_attributes())
    }

    /// Attributes this node introduces.
    #[must_use]
    pub fn produced_attributes(&self) -> AttributeSet {
        match &self.kind {
            PlanKind::Leaf(_) => self.output_set().clone(),
            PlanKind::Unary { op, child } => match op {
                UnaryOperator::Generate(node) => node.generator_output.iter().collect(),
                UnaryOperator::Window(node) => node.window_expressions.iter().filter_map(Expr::to_attribute).collect(),
                UnaryOperator::Expand(_) => self.output_set().difference(child.output_set()),
                _ => AttributeSet::new(),
            },
            PlanKind::Binary { op: BinaryOperator::Join(node), .. } => match &node.join_type {
                super::join::JoinType::ExistenceJoin(marker) => [marker].into_iter().collect(),
                _ => AttributeSet::new(),
            },
            _ => AttributeSet::new(),
        }
    }

    // ========== Tags ==========

    /// The tag store.
    #[must_use]
    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    /// Looks up a tag.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key)
    }

    /// Sets a tag on this node.
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.set(key, value);
    }

    /// Removes a tag from this node.
    pub fn unset_tag(&mut self, key: &str) -> Option<String> {
        self.tags.remove(key)
    }

    /// Copies `other`'s tags onto this node if it has none of its own.
    pub fn copy_tags_from(&mut self, other: &Self) {
        if self.tags.is_empty() {
            self.tags = other.tags.clone();
        }
    }

    /// Returns the plan with the given tags.
    #[must_use]
    pub(crate) fn with_tags(mut self, tags: TagStore) -> Self {
        self.tags = tags;
        self
    }

    // ========== Rewriting ==========

    /// Rebuilds this node over new children, keeping its tags.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::ChildCountMismatch`] if the number of children
    /// differs from the operator's arity.
    pub fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<Self> {
        let mismatch = |expected: usize, actual: usize| PlanError::ChildCountMismatch {
            operator: self.node_name(),
            expected,
            actual,
        };
        let actual = children.len();
        let kind = match &self.kind {
            PlanKind::Leaf(op) => {
                if actual != 0 {
                    return Err(mismatch(0, actual));
                }
                PlanKind::Leaf(op.clone())
            }
            PlanKind::Unary { op, .. } => {
                let [child]: [LogicalPlan; 1] = children.try_into().map_err(|_| mismatch(1, actual))?;
                PlanKind::Unary { op: op.clone(), child: Box::new(child) }
            }
            PlanKind::Binary { op, .. } => {
                let [left, right]: [LogicalPlan; 2] = children.try_into().map_err(|_| mismatch(2, actual))?;
                PlanKind::Binary { op: op.clone(), left: Box::new(left), right: Box::new(right) }
            }
            PlanKind::Nary { op, children: old } => {
                if actual != old.len() {
                    return Err(mismatch(old.len(), actual));
                }
                PlanKind::Nary { op: op.clone(), children }
            }
        };
        Ok(Self::derive(kind).with_tags(self.tags.clone()))
    }

    /// Rebuilds this node with `f` applied to each of its expressions,
    /// including stored attribute lists (passed as attribute expressions).
    /// Children are unchanged; tags are kept.
    #[must_use]
    pub fn map_expressions(&self, f: &mut dyn FnMut(Expr) -> Expr) -> Self {
        let kind = match self.kind.clone() {
            PlanKind::Leaf(op) => PlanKind::Leaf(op.map_expressions(f)),
            PlanKind::Unary { op, child } => PlanKind::Unary { op: op.map_expressions(f), child },
            PlanKind::Binary { op, left, right } => PlanKind::Binary { op: op.map_expressions(f), left, right },
            PlanKind::Nary { op, children } => PlanKind::Nary { op, children },
        };
        Self::derive(kind).with_tags(self.tags.clone())
    }

    // ========== Display ==========

    /// Returns the operator name (for display/debugging).
    #[must_use]
    pub fn node_name(&self) -> &'static str {
        match &self.kind {
            PlanKind::Leaf(op) => match op {
                LeafOperator::LocalRelation(_) => "LocalRelation",
                LeafOperator::OneRowRelation => "OneRowRelation",
                LeafOperator::Range(_) => "Range",
                LeafOperator::CteRelationRef(_) => "CteRelationRef",
                LeafOperator::UnresolvedRelation(_) => "UnresolvedRelation",
            },
            PlanKind::Unary { op, .. } => match op {
                UnaryOperator::Project(_) => "Project",
                UnaryOperator::Filter(_) => "Filter",
                UnaryOperator::Generate(_) => "Generate",
                UnaryOperator::Sort(_) => "Sort",
                UnaryOperator::GlobalLimit(_) => "GlobalLimit",
                UnaryOperator::LocalLimit(_) => "LocalLimit",
                UnaryOperator::Tail(_) => "Tail",
                UnaryOperator::Offset(_) => "Offset",
                UnaryOperator::Subquery(_) => "Subquery",
                UnaryOperator::SubqueryAlias(_) => "SubqueryAlias",
                UnaryOperator::Aggregate(_) => "Aggregate",
                UnaryOperator::Window(_) => "Window",
                UnaryOperator::Expand(_) => "Expand",
                UnaryOperator::GroupingSets(_) => "GroupingSets",
                UnaryOperator::Pivot(_) => "Pivot",
                UnaryOperator::Distinct => "Distinct",
                UnaryOperator::Deduplicate(_) => "Deduplicate",
                UnaryOperator::Sample(_) => "Sample",
                UnaryOperator::Repartition(_) => "Repartition",
                UnaryOperator::RepartitionByExpression(_) => "RepartitionByExpression",
                UnaryOperator::View(_) => "View",
                UnaryOperator::CteRelationDef(_) => "CteRelationDef",
                UnaryOperator::CollectMetrics(_) => "CollectMetrics",
                UnaryOperator::InsertIntoDir(_) => "InsertIntoDir",
                UnaryOperator::ResolvedHint(_) => "ResolvedHint",
            },
            PlanKind::Binary { op, .. } => match op {
                BinaryOperator::Join(_) => "Join",
                BinaryOperator::Intersect(_) => "Intersect",
                BinaryOperator::Except(_) => "Except",
            },
            PlanKind::Nary { op, .. } => match op {
                NaryOperator::Union(_) => "Union",
                NaryOperator::WithCte => "WithCte",
            },
        }
    }

    /// Pretty prints the plan as a tree.
    #[must_use]
    pub fn display_tree(&self) -> DisplayTree<'_> {
        DisplayTree { plan: self }
    }
}

pub(crate) fn kind_children(kind: &PlanKind) -> Vec<&LogicalPlan> {
    match kind {
        PlanKind::Leaf(_) => Vec::new(),
        PlanKind::Unary { child, .. } => vec![child.as_ref()],
        PlanKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        PlanKind::Nary { children, .. } => children.iter().collect(),
    }
}

pub(crate) fn operator_expressions(kind: &PlanKind) -> Vec<&Expr> {
    match kind {
        PlanKind::Leaf(_) | PlanKind::Nary { .. } => Vec::new(),
        PlanKind::Unary { op, .. } => op.expressions(),
        PlanKind::Binary { op: BinaryOperator::Join(node), .. } => node.condition.iter().collect(),
        PlanKind::Binary { .. } => Vec::new(),
    }
}

fn node_patterns(kind: &PlanKind) -> TreePatternBits {
    use TreePattern as P;
    let of = |p: &[TreePattern]| TreePatternBits::of(p);
    match kind {
        PlanKind::Leaf(op) => match op {
            LeafOperator::LocalRelation(_) => of(&[P::LocalRelation]),
            LeafOperator::OneRowRelation => TreePatternBits::empty(),
            LeafOperator::Range(_) => of(&[P::Range]),
            LeafOperator::CteRelationRef(_) => of(&[P::Cte]),
            LeafOperator::UnresolvedRelation(_) => of(&[P::UnresolvedRelation]),
        },
        PlanKind::Unary { op, .. } => match op {
            UnaryOperator::Project(_) => of(&[P::Project]),
            UnaryOperator::Filter(_) => of(&[P::Filter]),
            UnaryOperator::Generate(_) => of(&[P::Generate]),
            UnaryOperator::Sort(_) => of(&[P::Sort]),
            UnaryOperator::GlobalLimit(_) | UnaryOperator::LocalLimit(_) => of(&[P::Limit]),
            UnaryOperator::Tail(_) => of(&[P::Tail]),
            UnaryOperator::Offset(_) => of(&[P::Offset]),
            UnaryOperator::SubqueryAlias(_) => of(&[P::SubqueryAlias]),
            UnaryOperator::Aggregate(_) => of(&[P::Aggregate]),
            UnaryOperator::Window(_) => of(&[P::Window]),
            UnaryOperator::Expand(_) => of(&[P::Expand]),
            UnaryOperator::Pivot(_) => of(&[P::Pivot]),
            UnaryOperator::Distinct | UnaryOperator::Deduplicate(_) => of(&[P::DistinctLike]),
            UnaryOperator::Sample(_) => of(&[P::Sample]),
            UnaryOperator::Repartition(_) | UnaryOperator::RepartitionByExpression(_) => {
                of(&[P::RepartitionOperation])
            }
            UnaryOperator::View(_) => of(&[P::View]),
            UnaryOperator::CteRelationDef(_) => of(&[P::Cte]),
            UnaryOperator::CollectMetrics(_) => of(&[P::CollectMetrics]),
            UnaryOperator::ResolvedHint(_) => of(&[P::Hint]),
            UnaryOperator::Subquery(_) | UnaryOperator::GroupingSets(_) | UnaryOperator::InsertIntoDir(_) => {
                TreePatternBits::empty()
            }
        },
        PlanKind::Binary { op, .. } => match op {
            BinaryOperator::Join(node) => node.join_type.patterns(),
            BinaryOperator::Intersect(_) => of(&[P::Intersect]),
            BinaryOperator::Except(_) => of(&[P::Except]),
        },
        PlanKind::Nary { op, .. } => match op {
            NaryOperator::Union(_) => of(&[P::Union]),
            NaryOperator::WithCte => of(&[P::Cte]),
        },
    }
}

// ========== Operator expressions ==========

/// Maps a stored attribute through an expression rewrite.
fn map_attribute(attr: Attribute, f: &mut dyn FnMut(Expr) -> Expr) -> Attribute {
    match f(Expr::Attribute(attr.clone())) {
        Expr::Attribute(mapped) => mapped,
        _ => attr,
    }
}

fn map_attributes(attrs: Vec<Attribute>, f: &mut dyn FnMut(Expr) -> Expr) -> Vec<Attribute> {
    attrs.into_iter().map(|a| map_attribute(a, f)).collect()
}

fn map_all(exprs: Vec<Expr>, f: &mut dyn FnMut(Expr) -> Expr) -> Vec<Expr> {
    exprs.into_iter().map(f).collect()
}

impl LeafOperator {
    /// Attribute lists stored in the operator.
    #[must_use]
    pub fn stored_attributes(&self) -> Vec<&Attribute> {
        match self {
            Self::LocalRelation(node) => node.output.iter().collect(),
            Self::Range(node) => vec![&node.output],
            Self::CteRelationRef(node) => node.output.iter().collect(),
            Self::OneRowRelation | Self::UnresolvedRelation(_) => Vec::new(),
        }
    }

    pub(crate) fn map_expressions(self, f: &mut dyn FnMut(Expr) -> Expr) -> Self {
        match self {
            Self::LocalRelation(node) => {
                Self::LocalRelation(LocalRelationNode { output: map_attributes(node.output, f), rows: node.rows })
            }
            Self::Range(node) => {
                let output = map_attribute(node.output.clone(), f);
                Self::Range(RangeNode { output, ..node })
            }
            Self::CteRelationRef(node) => {
                let output = map_attributes(node.output, f);
                Self::CteRelationRef(CteRelationRefNode { output, ..node })
            }
            other @ (Self::OneRowRelation | Self::UnresolvedRelation(_)) => other,
        }
    }
}

impl UnaryOperator {
    /// The expressions this operator holds, excluding stored attribute lists.
    #[must_use]
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            Self::Project(node) => node.project_list.iter().collect(),
            Self::Filter(node) => vec![&node.condition],
            Self::Generate(node) => vec![&node.generator],
            Self::Sort(node) => node.order.iter().collect(),
            Self::GlobalLimit(node) | Self::LocalLimit(node) | Self::Tail(node) => vec![&node.limit_expr],
            Self::Offset(node) => vec![&node.offset_expr],
            Self::Aggregate(node) => {
                node.grouping_expressions.iter().chain(node.aggregate_expressions.iter()).collect()
            }
            Self::Window(node) => node
                .window_expressions
                .iter()
                .chain(node.partition_spec.iter())
                .chain(node.order_spec.iter())
                .collect(),
            Self::Expand(node) => node.projections.iter().flatten().collect(),
            Self::GroupingSets(node) => node
                .selected_group_by_exprs
                .iter()
                .flatten()
                .chain(node.group_by_exprs.iter())
                .chain(node.aggregations.iter())
                .collect(),
            Self::Pivot(node) => node
                .group_by
                .iter()
                .flatten()
                .chain(std::iter::once(&node.pivot_column))
                .chain(node.pivot_values.iter())
                .chain(node.aggregates.iter())
                .collect(),
            Self::RepartitionByExpression(node) => node.partition_expressions.iter().collect(),
            Self::CollectMetrics(node) => node.metrics.iter().collect(),
            Self::Subquery(_)
            | Self::SubqueryAlias(_)
            | Self::Distinct
            | Self::Deduplicate(_)
            | Self::Sample(_)
            | Self::Repartition(_)
            | Self::View(_)
            | Self::CteRelationDef(_)
            | Self::InsertIntoDir(_)
            | Self::ResolvedHint(_) => Vec::new(),
        }
    }

    /// Attribute lists stored in the operator.
    #[must_use]
    pub fn stored_attributes(&self) -> Vec<&Attribute> {
        match self {
            Self::Generate(node) => node.generator_output.iter().collect(),
            Self::Expand(node) => node.output.iter().collect(),
            Self::Pivot(node) => node.pivot_output.iter().collect(),
            Self::Deduplicate(node) => node.keys.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn map_expressions(self, f: &mut dyn FnMut(Expr) -> Expr) -> Self {
        match self {
            Self::Project(node) => Self::Project(ProjectNode { project_list: map_all(node.project_list, f) }),
            Self::Filter(node) => Self::Filter(FilterNode { condition: f(node.condition) }),
            Self::Generate(node) => {
                let node = *node;
                let generator = f(node.generator);
                let generator_output = map_attributes(node.generator_output, f);
                Self::Generate(Box::new(GenerateNode { generator, generator_output, ..node }))
            }
            Self::Sort(node) => Self::Sort(SortNode { order: map_all(node.order, f), global: node.global }),
            Self::GlobalLimit(node) => Self::GlobalLimit(LimitNode { limit_expr: f(node.limit_expr) }),
            Self::LocalLimit(node) => Self::LocalLimit(LimitNode { limit_expr: f(node.limit_expr) }),
            Self::Tail(node) => Self::Tail(LimitNode { limit_expr: f(node.limit_expr) }),
            Self::Offset(node) => Self::Offset(OffsetNode { offset_expr: f(node.offset_expr) }),
            Self::Aggregate(node) => {
                let grouping_expressions = map_all(node.grouping_expressions, f);
                Self::Aggregate(AggregateNode {
                    grouping_expressions,
                    aggregate_expressions: map_all(node.aggregate_expressions, f),
                })
            }
            Self::Window(node) => {
                let window_expressions = map_all(node.window_expressions, f);
                let partition_spec = map_all(node.partition_spec, f);
                Self::Window(WindowNode { window_expressions, partition_spec, order_spec: map_all(node.order_spec, f) })
            }
            Self::Expand(node) => {
                let projections = node.projections.into_iter().map(|p| map_all(p, f)).collect();
                Self::Expand(ExpandNode { projections, output: map_attributes(node.output, f) })
            }
            Self::GroupingSets(node) => {
                let selected_group_by_exprs =
                    node.selected_group_by_exprs.into_iter().map(|set| map_all(set, f)).collect();
                let group_by_exprs = map_all(node.group_by_exprs, f);
                Self::GroupingSets(GroupingSetsNode {
                    selected_group_by_exprs,
                    group_by_exprs,
                    aggregations: map_all(node.aggregations, f),
                })
            }
            Self::Pivot(node) => {
                let node = *node;
                let group_by = node.group_by.map(|g| map_all(g, f));
                let pivot_column = f(node.pivot_column);
                let pivot_values = map_all(node.pivot_values, f);
                let aggregates = map_all(node.aggregates, f);
                let pivot_output = map_attributes(node.pivot_output, f);
                Self::Pivot(Box::new(PivotNode { group_by, pivot_column, pivot_values, aggregates, pivot_output }))
            }
            Self::Deduplicate(node) => Self::Deduplicate(DeduplicateNode { keys: map_attributes(node.keys, f) }),
            Self::RepartitionByExpression(node) => Self::RepartitionByExpression(RepartitionByExpressionNode {
                partition_expressions: map_all(node.partition_expressions, f),
                num_partitions: node.num_partitions,
            }),
            Self::CollectMetrics(node) => {
                Self::CollectMetrics(CollectMetricsNode { name: node.name, metrics: map_all(node.metrics, f) })
            }
            other @ (Self::Subquery(_)
            | Self::SubqueryAlias(_)
            | Self::Distinct
            | Self::Sample(_)
            | Self::Repartition(_)
            | Self::View(_)
            | Self::CteRelationDef(_)
            | Self::InsertIntoDir(_)
            | Self::ResolvedHint(_)) => other,
        }
    }
}

impl BinaryOperator {
    /// Attribute lists stored in the operator.
    #[must_use]
    pub fn stored_attributes(&self) -> Vec<&Attribute> {
        match self {
            Self::Join(JoinNode { join_type: super::join::JoinType::ExistenceJoin(marker), .. }) => vec![marker],
            _ => Vec::new(),
        }
    }

    pub(crate) fn map_expressions(self, f: &mut dyn FnMut(Expr) -> Expr) -> Self {
        match self {
            Self::Join(node) => {
                let join_type = match node.join_type {
                    super::join::JoinType::ExistenceJoin(marker) => {
                        super::join::JoinType::ExistenceJoin(map_attribute(marker, f))
                    }
                    other => other,
                };
                Self::Join(JoinNode { join_type, condition: node.condition.map(&mut *f), hint: node.hint })
            }
            other @ (Self::Intersect(_) | Self::Except(_)) => other,
        }
    }
}

/// Attribute lists stored in an operator (not derived from its children).
pub(crate) fn stored_attributes(kind: &PlanKind) -> Vec<&Attribute> {
    match kind {
        PlanKind::Leaf(op) => op.stored_attributes(),
        PlanKind::Unary { op, .. } => op.stored_attributes(),
        PlanKind::Binary { op, .. } => op.stored_attributes(),
        PlanKind::Nary { .. } => Vec::new(),
    }
}

// ========== Display ==========

/// Helper for tree-style plan display.
pub struct DisplayTree<'a> {
    plan: &'a LogicalPlan,
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::fmt_node(f, self.plan, "", true)
    }
}

fn join_list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

impl DisplayTree<'_> {
    fn fmt_node(f: &mut fmt::Formatter<'_>, plan: &LogicalPlan, prefix: &str, is_last: bool) -> fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };

        write!(f, "{prefix}{connector}")?;
        Self::fmt_node_content(f, plan)?;
        writeln!(f)?;

        let children = plan.children();
        let new_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });

        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, child, &new_prefix, i == children.len() - 1)?;
        }

        Ok(())
    }

    fn fmt_node_content(f: &mut fmt::Formatter<'_>, plan: &LogicalPlan) -> fmt::Result {
        write!(f, "{}", plan.node_name())?;
        match &plan.kind {
            PlanKind::Leaf(op) => match op {
                LeafOperator::LocalRelation(node) => {
                    write!(f, " [{}], {} rows", join_list(&node.output), node.rows.len())
                }
                LeafOperator::Range(node) => {
                    write!(f, " ({}, {}, step={}", node.start, node.end, node.step)?;
                    if let Some(slices) = node.num_slices {
                        write!(f, ", splits={slices}")?;
                    }
                    write!(f, ")")
                }
                LeafOperator::CteRelationRef(node) => write!(f, " {} [{}]", node.cte_id, join_list(&node.output)),
                LeafOperator::UnresolvedRelation(node) => write!(f, " {}", node.multipart_identifier.join(".")),
                LeafOperator::OneRowRelation => Ok(()),
            },
            PlanKind::Unary { op, .. } => match op {
                UnaryOperator::Project(node) => write!(f, " [{}]", join_list(&node.project_list)),
                UnaryOperator::Filter(node) => write!(f, " {}", node.condition),
                UnaryOperator::Generate(node) => {
                    write!(f, " {}, [{}]", node.generator, join_list(&node.generator_output))?;
                    if node.outer {
                        write!(f, " outer")?;
                    }
                    Ok(())
                }
                UnaryOperator::Sort(node) => write!(f, " [{}], {}", join_list(&node.order), node.global),
                UnaryOperator::GlobalLimit(node) | UnaryOperator::LocalLimit(node) | UnaryOperator::Tail(node) => {
                    write!(f, " {}", node.limit_expr)
                }
                UnaryOperator::Offset(node) => write!(f, " {}", node.offset_expr),
                UnaryOperator::Subquery(node) => {
                    if node.correlated {
                        write!(f, " correlated")?;
                    }
                    Ok(())
                }
                UnaryOperator::SubqueryAlias(node) => write!(f, " {}", node.identifier.qualifier_path().join(".")),
                UnaryOperator::Aggregate(node) => write!(
                    f,
                    " [{}], [{}]",
                    join_list(&node.grouping_expressions),
                    join_list(&node.aggregate_expressions)
                ),
                UnaryOperator::Window(node) => write!(
                    f,
                    " [{}], [{}], [{}]",
                    join_list(&node.window_expressions),
                    join_list(&node.partition_spec),
                    join_list(&node.order_spec)
                ),
                UnaryOperator::Expand(node) => {
                    write!(f, " {} projections, [{}]", node.projections.len(), join_list(&node.output))
                }
                UnaryOperator::GroupingSets(node) => {
                    write!(f, " {} sets, [{}]", node.selected_group_by_exprs.len(), join_list(&node.aggregations))
                }
                UnaryOperator::Pivot(node) => {
                    write!(f, " {} IN ({}), [{}]", node.pivot_column, join_list(&node.pivot_values), join_list(&node.aggregates))
                }
                UnaryOperator::Deduplicate(node) => write!(f, " [{}]", join_list(&node.keys)),
                UnaryOperator::Sample(node) => write!(
                    f,
                    " {}, {}, {}, {}",
                    node.lower_bound, node.upper_bound, node.with_replacement, node.seed
                ),
                UnaryOperator::Repartition(node) => write!(f, " {}, {}", node.num_partitions, node.shuffle),
                UnaryOperator::RepartitionByExpression(node) => {
                    write!(f, " [{}], {}", join_list(&node.partition_expressions), node.num_partitions)
                }
                UnaryOperator::View(node) => {
                    write!(f, " ({}, {})", node.desc.qualified_name(), if node.is_temp_view { "temp" } else { "persistent" })
                }
                UnaryOperator::CteRelationDef(node) => write!(f, " {}", node.id),
                UnaryOperator::CollectMetrics(node) => write!(f, " {}, [{}]", node.name, join_list(&node.metrics)),
                UnaryOperator::InsertIntoDir(node) => write!(f, " {}", node.path),
                UnaryOperator::ResolvedHint(hint) => match &hint.strategy {
                    Some(s) => write!(f, " {s}"),
                    None => Ok(()),
                },
                UnaryOperator::Distinct => Ok(()),
            },
            PlanKind::Binary { op, .. } => match op {
                BinaryOperator::Join(node) => {
                    write!(f, " {}", node.join_type)?;
                    if let Some(cond) = &node.condition {
                        write!(f, ", {cond}")?;
                    }
                    Ok(())
                }
                BinaryOperator::Intersect(node) | BinaryOperator::Except(node) => {
                    if node.is_all {
                        write!(f, " All")?;
                    }
                    Ok(())
                }
            },
            PlanKind::Nary { op, children } => match op {
                NaryOperator::Union(node) => {
                    write!(f, " {} inputs", children.len())?;
                    if node.by_name {
                        write!(f, " by name")?;
                    }
                    Ok(())
                }
                NaryOperator::WithCte => write!(f, " {} definitions", children.len().saturating_sub(1)),
            },
        }
    }
}
