//! Output schema derivation.

use super::join::JoinType;
use super::node::{BinaryOperator, LeafOperator, NaryOperator, PlanKind, UnaryOperator};
use crate::expr::{Attribute, Expr};

/// Computes the output columns of an operator over its children.
pub(crate) fn output(kind: &PlanKind) -> Vec<Attribute> {
    match kind {
        PlanKind::Leaf(op) => leaf_output(op),
        PlanKind::Unary { op, child } => unary_output(op, child.output()),
        PlanKind::Binary { op, left, right } => binary_output(op, left.output(), right.output()),
        PlanKind::Nary { op, children } => match op {
            NaryOperator::Union(_) => {
                let outputs: Vec<&[Attribute]> = children.iter().map(|c| c.output()).collect();
                union_output(&outputs)
            }
            NaryOperator::WithCte => children.last().map(|c| c.output().to_vec()).unwrap_or_default(),
        },
    }
}

fn leaf_output(op: &LeafOperator) -> Vec<Attribute> {
    match op {
        LeafOperator::LocalRelation(node) => node.output.clone(),
        LeafOperator::Range(node) => vec![node.output.clone()],
        LeafOperator::CteRelationRef(node) => node.output.clone(),
        LeafOperator::OneRowRelation | LeafOperator::UnresolvedRelation(_) => Vec::new(),
    }
}

fn named(exprs: &[Expr]) -> impl Iterator<Item = Attribute> + '_ {
    exprs.iter().filter_map(Expr::to_attribute)
}

fn unary_output(op: &UnaryOperator, child: &[Attribute]) -> Vec<Attribute> {
    match op {
        UnaryOperator::Project(node) => named(&node.project_list).collect(),
        UnaryOperator::Aggregate(node) => named(&node.aggregate_expressions).collect(),
        UnaryOperator::Generate(node) => {
            let mut out: Vec<Attribute> = child
                .iter()
                .enumerate()
                .filter(|(i, _)| !node.unrequired_child_index.contains(i))
                .map(|(_, a)| a.clone())
                .collect();
            out.extend(node.qualified_generator_output());
            out
        }
        UnaryOperator::SubqueryAlias(node) => {
            let path = node.identifier.qualifier_path();
            child.iter().map(|a| a.clone().with_qualifier(path.clone())).collect()
        }
        UnaryOperator::Window(node) => child.iter().cloned().chain(named(&node.window_expressions)).collect(),
        UnaryOperator::Expand(node) => node.output.clone(),
        UnaryOperator::GroupingSets(node) => named(&node.aggregations).collect(),
        UnaryOperator::Pivot(node) => {
            let group = node.group_by.as_deref().unwrap_or_default();
            named(group).chain(node.pivot_output.iter().cloned()).collect()
        }
        UnaryOperator::InsertIntoDir(_) => Vec::new(),
        UnaryOperator::Filter(_)
        | UnaryOperator::Sort(_)
        | UnaryOperator::GlobalLimit(_)
        | UnaryOperator::LocalLimit(_)
        | UnaryOperator::Tail(_)
        | UnaryOperator::Offset(_)
        | UnaryOperator::Subquery(_)
        | UnaryOperator::Distinct
        | UnaryOperator::Deduplicate(_)
        | UnaryOperator::Sample(_)
        | UnaryOperator::Repartition(_)
        | UnaryOperator::RepartitionByExpression(_)
        | UnaryOperator::View(_)
        | UnaryOperator::CteRelationDef(_)
        | UnaryOperator::CollectMetrics(_)
        | UnaryOperator::ResolvedHint(_) => child.to_vec(),
    }
}

fn nullable(attrs: &[Attribute]) -> impl Iterator<Item = Attribute> + '_ {
    attrs.iter().map(|a| a.clone().with_nullability(true))
}

fn binary_output(op: &BinaryOperator, left: &[Attribute], right: &[Attribute]) -> Vec<Attribute> {
    match op {
        BinaryOperator::Join(node) => match &node.join_type {
            JoinType::ExistenceJoin(marker) => left.iter().chain(std::iter::once(marker)).cloned().collect(),
            JoinType::LeftSemi | JoinType::LeftAnti => left.to_vec(),
            JoinType::LeftOuter => left.iter().cloned().chain(nullable(right)).collect(),
            JoinType::RightOuter => nullable(left).chain(right.iter().cloned()).collect(),
            JoinType::FullOuter => nullable(left).chain(nullable(right)).collect(),
            JoinType::Inner | JoinType::Cross | JoinType::NaturalJoin(_) | JoinType::UsingJoin(..) => {
                left.iter().chain(right).cloned().collect()
            }
        },
        BinaryOperator::Intersect(_) => left
            .iter()
            .zip(right)
            .map(|(l, r)| l.clone().with_nullability(l.nullable && r.nullable))
            .collect(),
        BinaryOperator::Except(_) => left.to_vec(),
    }
}

/// Merges the outputs of union children column by column.
///
/// Each column keeps the first child's name and identity. It is nullable if
/// any child's column is, and its type is the union-like merge of all the
/// children's types. Columns beyond the narrowest child are dropped.
pub(crate) fn union_output(outputs: &[&[Attribute]]) -> Vec<Attribute> {
    let Some((first, rest)) = outputs.split_first() else {
        return Vec::new();
    };
    let width = outputs.iter().map(|o| o.len()).min().unwrap_or(0);
    (0..width)
        .map(|i| {
            let head = &first[i];
            let nullable = head.nullable || rest.iter().any(|o| o[i].nullable);
            let merged = rest.iter().fold(head.data_type.clone(), |acc, o| acc.union_like_merge(&o[i].data_type));
            let attr = head.clone().with_nullability(nullable);
            if merged == head.data_type {
                attr
            } else {
                attr.with_data_type(merged)
            }
        })
        .collect()
}
