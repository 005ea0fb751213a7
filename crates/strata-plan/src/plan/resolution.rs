//! Resolution.
//!
//! A node is resolved when its children and its own expressions are
//! resolved and its operator-specific side conditions hold. Resolution is
//! only ever gained by building a new node.

use strata_core::DataType;

use super::join::JoinType;
use super::node::{
    kind_children, operator_expressions, BinaryOperator, LeafOperator, LogicalPlan, NaryOperator, PlanKind,
    UnaryOperator,
};
use crate::expr::{Attribute, Expr};

pub(crate) fn resolved(kind: &PlanKind) -> bool {
    let children_resolved = kind_children(kind).iter().all(|c| c.resolved());
    let expressions_resolved = || operator_expressions(kind).iter().all(|e| e.resolved());

    match kind {
        PlanKind::Leaf(op) => match op {
            LeafOperator::CteRelationRef(node) => node.resolved,
            LeafOperator::UnresolvedRelation(_) => false,
            LeafOperator::LocalRelation(_) | LeafOperator::OneRowRelation | LeafOperator::Range(_) => true,
        },
        PlanKind::Unary { op, .. } => children_resolved && expressions_resolved() && unary_side_conditions(op),
        PlanKind::Binary { op, left, right } => {
            children_resolved && expressions_resolved() && binary_side_conditions(op, left, right)
        }
        PlanKind::Nary { op, children } => match op {
            NaryOperator::Union(node) => {
                children.len() > 1
                    && !node.by_name
                    && !node.allow_missing_col
                    && children_resolved
                    && union_columns_match(children)
            }
            NaryOperator::WithCte => children_resolved,
        },
    }
}

fn unary_side_conditions(op: &UnaryOperator) -> bool {
    match op {
        UnaryOperator::Project(node) => node.project_list.iter().all(projectable),
        UnaryOperator::Aggregate(node) => node.aggregate_expressions.iter().all(|e| !e.contains_window()),
        UnaryOperator::Generate(node) => {
            let schema_len = node.generator.element_schema().map_or(0, <[_]>::len);
            schema_len == node.generator_output.len()
        }
        UnaryOperator::CollectMetrics(node) => !node.name.is_empty() && !node.metrics.is_empty(),
        UnaryOperator::Pivot(_) | UnaryOperator::InsertIntoDir(_) | UnaryOperator::GroupingSets(_) => false,
        UnaryOperator::Filter(_)
        | UnaryOperator::Sort(_)
        | UnaryOperator::GlobalLimit(_)
        | UnaryOperator::LocalLimit(_)
        | UnaryOperator::Tail(_)
        | UnaryOperator::Offset(_)
        | UnaryOperator::Subquery(_)
        | UnaryOperator::SubqueryAlias(_)
        | UnaryOperator::Window(_)
        | UnaryOperator::Expand(_)
        | UnaryOperator::Distinct
        | UnaryOperator::Deduplicate(_)
        | UnaryOperator::Sample(_)
        | UnaryOperator::Repartition(_)
        | UnaryOperator::RepartitionByExpression(_)
        | UnaryOperator::View(_)
        | UnaryOperator::CteRelationDef(_)
        | UnaryOperator::ResolvedHint(_) => true,
    }
}

fn binary_side_conditions(op: &BinaryOperator, left: &LogicalPlan, right: &LogicalPlan) -> bool {
    match op {
        BinaryOperator::Join(node) => {
            if matches!(node.join_type, JoinType::NaturalJoin(_) | JoinType::UsingJoin(..)) {
                return false;
            }
            let duplicate_resolved = left.output_set().intersect(right.output_set()).is_empty();
            let condition_ok = node.condition.as_ref().map_or(true, |c| c.data_type() == DataType::Boolean);
            duplicate_resolved && condition_ok
        }
        BinaryOperator::Intersect(_) | BinaryOperator::Except(_) => {
            let (l, r) = (left.output(), right.output());
            l.len() == r.len()
                && l.iter().zip(r).all(|(a, b)| a.data_type.same_type(&b.data_type))
                && left.output_set().intersect(right.output_set()).is_empty()
        }
    }
}

fn union_columns_match(children: &[LogicalPlan]) -> bool {
    let Some((first, rest)) = children.split_first() else {
        return false;
    };
    let head = first.output();
    rest.iter().all(|child| {
        let other: &[Attribute] = child.output();
        other.len() == head.len()
            && head.iter().zip(other).all(|(a, b)| a.data_type.equals_structurally(&b.data_type))
    })
}

/// Aggregates, generators and window functions need their own operators.
fn projectable(expr: &Expr) -> bool {
    !expr.contains_aggregate() && !expr.contains_generator() && !expr.contains_window()
}
