//! Row-count upper bounds.
//!
//! Bounds are conservative: `None` means unknown, never zero. Products and
//! sums are computed in `u128` and only exposed if they fit in a `u64`.

use super::join::JoinType;
use super::node::{BinaryOperator, LeafOperator, LogicalPlan, NaryOperator, PlanKind, UnaryOperator};

/// `(max_rows, max_rows_per_partition)` of an operator over its children.
pub(crate) fn bounds(kind: &PlanKind) -> (Option<u64>, Option<u64>) {
    match kind {
        PlanKind::Leaf(op) => leaf_bounds(op),
        PlanKind::Unary { op, child } => unary_bounds(op, child),
        PlanKind::Binary { op, left, right } => {
            let max = binary_max_rows(op, left, right);
            (max, max)
        }
        PlanKind::Nary { op, children } => match op {
            NaryOperator::Union(_) => (
                checked_sum(children.iter().map(LogicalPlan::max_rows)),
                checked_sum(children.iter().map(LogicalPlan::max_rows_per_partition)),
            ),
            NaryOperator::WithCte => {
                children.last().map_or((None, None), |c| (c.max_rows(), c.max_rows_per_partition()))
            }
        },
    }
}

fn fit(n: u128) -> Option<u64> {
    u64::try_from(n).ok()
}

fn checked_sum(bounds: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    let mut total: u128 = 0;
    for bound in bounds {
        total += u128::from(bound?);
    }
    fit(total)
}

fn leaf_bounds(op: &LeafOperator) -> (Option<u64>, Option<u64>) {
    match op {
        LeafOperator::LocalRelation(node) => {
            let rows = u64::try_from(node.rows.len()).ok();
            (rows, rows)
        }
        LeafOperator::OneRowRelation => (Some(1), Some(1)),
        LeafOperator::Range(node) => (node.max_rows(), node.max_rows_per_partition()),
        LeafOperator::CteRelationRef(_) | LeafOperator::UnresolvedRelation(_) => (None, None),
    }
}

fn unary_bounds(op: &UnaryOperator, child: &LogicalPlan) -> (Option<u64>, Option<u64>) {
    let (child_max, child_partition) = (child.max_rows(), child.max_rows_per_partition());
    let max = match op {
        UnaryOperator::Project(_)
        | UnaryOperator::Filter(_)
        | UnaryOperator::Window(_)
        | UnaryOperator::CollectMetrics(_)
        | UnaryOperator::ResolvedHint(_) => return (child_max, child_partition),
        UnaryOperator::Sort(node) => {
            return (child_max, if node.global { child_max } else { child_partition });
        }
        UnaryOperator::Sample(node) => {
            return if node.with_replacement { (None, None) } else { (child_max, child_partition) };
        }
        UnaryOperator::Aggregate(node) => {
            return if node.grouping_expressions.is_empty() {
                (Some(1), Some(1))
            } else {
                (child_max, child_partition)
            };
        }
        UnaryOperator::LocalLimit(node) => return (None, node.literal_limit()),
        UnaryOperator::GlobalLimit(node) | UnaryOperator::Tail(node) => node.literal_limit(),
        UnaryOperator::Offset(node) => match node.literal_offset() {
            Some(offset) => child_max.map(|n| n.saturating_sub(offset)),
            None => child_max,
        },
        UnaryOperator::Expand(node) => {
            let copies = u128::try_from(node.projections.len()).ok();
            child_max.zip(copies).and_then(|(n, k)| fit(u128::from(n) * k))
        }
        UnaryOperator::Subquery(_)
        | UnaryOperator::SubqueryAlias(_)
        | UnaryOperator::Distinct
        | UnaryOperator::Deduplicate(_)
        | UnaryOperator::Repartition(_)
        | UnaryOperator::RepartitionByExpression(_)
        | UnaryOperator::View(_)
        | UnaryOperator::CteRelationDef(_) => child_max,
        UnaryOperator::Generate(_)
        | UnaryOperator::Pivot(_)
        | UnaryOperator::GroupingSets(_)
        | UnaryOperator::InsertIntoDir(_) => None,
    };
    (max, max)
}

fn binary_max_rows(op: &BinaryOperator, left: &LogicalPlan, right: &LogicalPlan) -> Option<u64> {
    match op {
        BinaryOperator::Join(node) => match &node.join_type {
            JoinType::Inner | JoinType::Cross | JoinType::LeftOuter | JoinType::RightOuter | JoinType::FullOuter => {
                let l = u128::from(left.max_rows()?);
                let r = u128::from(right.max_rows()?);
                // outer joins emit every row of their preserved side at least once
                let floor = match node.join_type {
                    JoinType::LeftOuter => l,
                    JoinType::RightOuter => r,
                    JoinType::FullOuter => l + r,
                    _ => 0,
                };
                fit((l * r).max(floor))
            }
            JoinType::LeftSemi | JoinType::LeftAnti => left.max_rows(),
            JoinType::ExistenceJoin(_) | JoinType::NaturalJoin(_) | JoinType::UsingJoin(..) => None,
        },
        BinaryOperator::Intersect(_) => Some(left.max_rows()?.min(right.max_rows()?)),
        BinaryOperator::Except(_) => left.max_rows(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strata_core::{DataType, Value};

    use super::*;
    use crate::expr::{Attribute, Expr};
    use crate::plan::{LimitNode, LocalRelationNode, OffsetNode};

    fn rows(n: usize) -> LogicalPlan {
        let a = Attribute::new("a", DataType::Long);
        let data = (0..n).map(|i| vec![Value::Int(i64::try_from(i).unwrap())]).collect();
        LogicalPlan::leaf(LeafOperator::LocalRelation(LocalRelationNode::new(vec![a], data)))
    }

    fn huge() -> LogicalPlan {
        LogicalPlan::range(i64::MIN, i64::MAX, 1).unwrap()
    }

    #[test]
    fn limits() {
        let global = rows(10).limit(5);
        assert_eq!(global.max_rows(), Some(5));

        let local = LogicalPlan::unary(UnaryOperator::LocalLimit(LimitNode::new(5)), rows(10));
        assert_eq!(local.max_rows_per_partition(), Some(5));
        assert_eq!(local.max_rows(), None);

        let n = Attribute::new("n", DataType::Integer);
        let symbolic = LimitNode { limit_expr: Expr::attr(&n) };
        let global = LogicalPlan::unary(UnaryOperator::GlobalLimit(symbolic.clone()), rows(10));
        let local = LogicalPlan::unary(UnaryOperator::LocalLimit(symbolic), rows(10));
        assert_eq!(global.max_rows(), None);
        assert_eq!(local.max_rows_per_partition(), None);
    }

    #[test]
    fn join_products() {
        let inner = rows(3).join(rows(4), JoinType::Inner, None);
        assert_eq!(inner.max_rows(), Some(12));
        assert_eq!(rows(3).join(rows(0), JoinType::LeftOuter, None).max_rows(), Some(3));
        assert_eq!(rows(0).join(rows(4), JoinType::RightOuter, None).max_rows(), Some(4));
        assert_eq!(rows(1).join(rows(0), JoinType::FullOuter, None).max_rows(), Some(1));
        assert_eq!(rows(3).join(rows(4), JoinType::LeftSemi, None).max_rows(), Some(3));
        let marker = Attribute::not_null("exists", DataType::Boolean);
        assert_eq!(rows(3).join(rows(4), JoinType::ExistenceJoin(marker), None).max_rows(), None);
    }

    #[test]
    fn join_overflow_is_unknown() {
        let join = huge().join(huge(), JoinType::Cross, None);
        assert_eq!(join.max_rows(), None);
    }

    #[test]
    fn aggregate_without_keys_is_one_row() {
        let a = Attribute::new("a", DataType::Long);
        let count = Expr::aggregate("count", vec![Expr::lit(1i64)], DataType::Long).alias("c");
        let plan = rows(10).aggregate(vec![], vec![count.clone()]);
        assert_eq!((plan.max_rows(), plan.max_rows_per_partition()), (Some(1), Some(1)));
        let grouped = rows(10).aggregate(vec![Expr::attr(&a)], vec![count]);
        assert_eq!(grouped.max_rows(), Some(10));
    }

    #[test]
    fn set_operations() {
        let union = LogicalPlan::union(vec![rows(2), rows(3), rows(4)]).unwrap();
        assert_eq!(union.max_rows(), Some(9));
        assert_eq!(rows(2).intersect(rows(7), false).max_rows(), Some(2));
        assert_eq!(rows(2).except(huge(), false).max_rows(), Some(2));
        assert_eq!(huge().union_all(rows(1)).max_rows(), None);
    }

    #[test]
    fn offset_and_expand() {
        let plan = LogicalPlan::unary(UnaryOperator::Offset(OffsetNode::new(3)), rows(10));
        assert_eq!(plan.max_rows(), Some(7));
        let plan = LogicalPlan::unary(UnaryOperator::Offset(OffsetNode::new(30)), rows(10));
        assert_eq!(plan.max_rows(), Some(0));

        let child = rows(10);
        let expand = crate::plan::ExpandNode::new(vec![vec![], vec![], vec![]], child.output().to_vec());
        assert_eq!(LogicalPlan::unary(UnaryOperator::Expand(expand), child).max_rows(), Some(30));
    }

    #[test]
    fn sort_per_partition() {
        let local = LogicalPlan::unary(UnaryOperator::LocalLimit(LimitNode::new(2)), rows(10));
        let sorted = local.sort(vec![], false);
        assert_eq!(sorted.max_rows_per_partition(), Some(2));
        let sorted = rows(10).sort(vec![], true);
        assert_eq!(sorted.max_rows_per_partition(), Some(10));
    }
}
