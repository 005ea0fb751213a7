//! Constraint inference.
//!
//! Every operator derives `valid_constraints` from its children's
//! constraints and its own expressions. The constraint set a node exposes
//! adds what can be inferred from those:
//!
//! - `a = b` between attributes (or an attribute and a cast attribute)
//!   substitutes one side for the other in every other predicate;
//! - every attribute reached through null-intolerant operators, and every
//!   non-nullable output column, gets an `IS NOT NULL`.
//!
//! Finally only deterministic predicates that reference something, and only
//! this node's output, are kept.

use std::collections::BTreeMap;

use strata_core::ExprId;

use super::join::JoinType;
use super::node::{BinaryOperator, LogicalPlan, NaryOperator, PlanKind, UnaryOperator};
use crate::error::{PlanError, PlanResult};
use crate::expr::{Attribute, AttributeMap, AttributeSet, BinaryOp, Expr, ExpressionSet};

pub(crate) fn valid_constraints(kind: &PlanKind) -> ExpressionSet {
    match kind {
        PlanKind::Leaf(_) => ExpressionSet::new(),
        PlanKind::Unary { op, child } => unary_constraints(op, child),
        PlanKind::Binary { op, left, right } => binary_constraints(op, left, right),
        PlanKind::Nary { op, children } => match op {
            NaryOperator::Union(_) => union_constraints(children),
            NaryOperator::WithCte => children.last().map(|c| c.constraints().clone()).unwrap_or_default(),
        },
    }
}

/// The exposed constraint set, from the operator's valid constraints.
pub(crate) fn finalize(valid: &ExpressionSet, output: &[Attribute], output_set: &AttributeSet) -> ExpressionSet {
    let mut all = valid.clone();
    all.extend(infer_additional(valid));
    all.extend(is_not_null_constraints(valid, output));
    all.filter(|c| {
        let refs = c.references();
        !refs.is_empty() && refs.is_subset_of(output_set) && c.deterministic()
    })
}

/// Rewrites `constraints` over `original` onto the positionally matching
/// attributes of `reference`.
///
/// # Errors
///
/// Returns [`PlanError::AttributeCountMismatch`] if the two lists differ in
/// length.
pub fn rewrite_constraints(
    reference: &[Attribute],
    original: &[Attribute],
    constraints: &ExpressionSet,
) -> PlanResult<ExpressionSet> {
    if reference.len() != original.len() {
        return Err(PlanError::AttributeCountMismatch {
            operation: "rewrite_constraints",
            expected: reference.len(),
            actual: original.len(),
        });
    }
    Ok(rewrite_onto(reference, original, constraints))
}

fn rewrite_onto(reference: &[Attribute], original: &[Attribute], constraints: &ExpressionSet) -> ExpressionSet {
    let rewrites: AttributeMap<&Attribute> = original.iter().zip(reference).collect();
    constraints.map(|c| {
        c.clone().transform_up(&mut |e| match e {
            Expr::Attribute(a) => Expr::Attribute(rewrites.get(&a).map_or(a, |r| (*r).clone())),
            other => other,
        })
    })
}

// ========== Per-operator rules ==========

fn unary_constraints(op: &UnaryOperator, child: &LogicalPlan) -> ExpressionSet {
    match op {
        UnaryOperator::Filter(node) => {
            let mut set = child.constraints().clone();
            set.extend(
                node.condition.split_conjunction().into_iter().filter(|c| !c.has_correlated_subquery()).cloned(),
            );
            set
        }
        UnaryOperator::Project(node) => alias_constraints(child.constraints(), &node.project_list),
        UnaryOperator::Aggregate(node) => {
            let grouped = node.aggregate_expressions.iter().filter(|e| !e.contains_aggregate());
            alias_constraints(child.constraints(), grouped)
        }
        // grouping columns are nulled in some copies of every row
        UnaryOperator::Expand(_) => ExpressionSet::new(),
        _ => child.constraints().clone(),
    }
}

/// Carries the child's constraints through aliases.
///
/// `x AS b` with a literal `x` adds `b <=> x`. With a deterministic `x`,
/// every constraint mentioning `x` is copied with `b` in its place and
/// `x <=> b` is added.
fn alias_constraints<'a>(inherited: &ExpressionSet, list: impl IntoIterator<Item = &'a Expr>) -> ExpressionSet {
    let mut all = inherited.clone();
    for expr in list {
        let (Expr::Alias { child, .. }, Some(attr)) = (expr, expr.to_attribute()) else {
            continue;
        };
        let alias_ref = Expr::attr(&attr);
        if matches!(child.as_ref(), Expr::Literal { .. }) {
            all.insert(alias_ref.eq_null_safe(child.as_ref().clone()));
        } else if child.deterministic() {
            let rewritten = all.map(|c| c.replace_semantic(child, &alias_ref));
            all = all.union(&rewritten);
            all.insert(child.as_ref().clone().eq_null_safe(alias_ref));
        }
    }
    all
}

fn binary_constraints(op: &BinaryOperator, left: &LogicalPlan, right: &LogicalPlan) -> ExpressionSet {
    match op {
        BinaryOperator::Join(node) => {
            let conjuncts = || -> ExpressionSet {
                node.condition.iter().flat_map(Expr::split_conjunction).cloned().collect()
            };
            let has_condition = node.condition.is_some();
            match &node.join_type {
                t if t.is_inner_like() && has_condition => {
                    left.constraints().union(right.constraints()).union(&conjuncts())
                }
                JoinType::LeftSemi if has_condition => left.constraints().union(&conjuncts()),
                t if t.is_inner_like() => left.constraints().union(right.constraints()),
                t if t.is_left_existence() => left.constraints().clone(),
                JoinType::LeftOuter => left.constraints().clone(),
                JoinType::RightOuter => right.constraints().clone(),
                _ => ExpressionSet::new(),
            }
        }
        BinaryOperator::Intersect(_) => {
            if left.output().len() == right.output().len() {
                left.constraints().union(&rewrite_onto(left.output(), right.output(), right.constraints()))
            } else {
                left.constraints().clone()
            }
        }
        BinaryOperator::Except(_) => left.constraints().clone(),
    }
}

/// Rewrites every child's constraints onto the first child's columns and
/// folds them together with [`merge`]. Children of different widths share
/// nothing.
fn union_constraints(children: &[LogicalPlan]) -> ExpressionSet {
    let Some(first) = children.first() else {
        return ExpressionSet::new();
    };
    let reference = first.output();
    if children.iter().any(|c| c.output().len() != reference.len()) {
        return ExpressionSet::new();
    }
    children
        .iter()
        .map(|c| rewrite_onto(reference, c.output(), c.constraints()))
        .reduce(|a, b| merge(&a, &b))
        .unwrap_or_default()
}

/// Keeps what both sides share, and loosens single-column predicates that
/// both sides have for the same column: `A1 && B1 || A2 && B2` becomes
/// `(A1 || A2) && (B1 || B2)`.
fn merge(a: &ExpressionSet, b: &ExpressionSet) -> ExpressionSet {
    let common = a.intersect(b);
    let by_column = |set: &ExpressionSet| {
        let mut groups: BTreeMap<ExprId, Vec<Expr>> = BTreeMap::new();
        for c in set.difference(&common).iter() {
            let refs = c.references();
            if let (1, Some(attr)) = (refs.len(), refs.first()) {
                groups.entry(attr.expr_id).or_default().push(c.clone());
            }
        }
        groups
    };
    let (left, right) = (by_column(a), by_column(b));

    let mut merged = common.clone();
    for (id, lhs) in &left {
        let Some(rhs) = right.get(id) else {
            continue;
        };
        let conjoined = (lhs.iter().cloned().reduce(Expr::and), rhs.iter().cloned().reduce(Expr::and));
        if let (Some(l), Some(r)) = conjoined {
            merged.insert(l.or(r));
        }
    }
    merged
}

// ========== Inference ==========

fn infer_additional(constraints: &ExpressionSet) -> ExpressionSet {
    let predicates = constraints.filter(|c| !matches!(c, Expr::IsNotNull(_)));
    let mut inferred = ExpressionSet::new();
    for eq in predicates.iter() {
        let Expr::Binary { left, op: BinaryOp::Eq, right } = eq else {
            continue;
        };
        let (left, right) = (left.as_ref(), right.as_ref());
        let others = predicates.filter(|c| !c.semantic_eq(eq));
        let is_attr = |e: &Expr| matches!(e, Expr::Attribute(_));
        let is_cast_attr = |e: &Expr| matches!(e, Expr::Cast { child, .. } if is_attr(child.as_ref()));
        if is_attr(left) && is_attr(right) {
            inferred.extend(replace_all(&others, left, right));
            inferred.extend(replace_all(&others, right, left));
        } else if is_cast_attr(left) && is_attr(right) {
            inferred.extend(replace_all(&others, right, left));
        } else if is_attr(left) && is_cast_attr(right) {
            inferred.extend(replace_all(&others, left, right));
        }
    }
    inferred.difference(constraints)
}

fn replace_all(set: &ExpressionSet, source: &Expr, destination: &Expr) -> ExpressionSet {
    set.map(|c| c.replace_semantic(source, destination))
}

fn is_not_null_constraints(constraints: &ExpressionSet, output: &[Attribute]) -> ExpressionSet {
    let mut out = ExpressionSet::new();
    for c in constraints.iter() {
        let scanned = match c {
            Expr::IsNotNull(inner) => inner.as_ref(),
            other => other,
        };
        let mut attrs = Vec::new();
        scan_null_intolerant(scanned, &mut attrs);
        out.extend(attrs.into_iter().map(|a| Expr::attr(a).is_not_null()));
    }
    out.extend(output.iter().filter(|a| !a.nullable).map(|a| Expr::attr(a).is_not_null()));
    out.difference(constraints)
}

/// Attributes that force the whole expression to NULL when they are NULL.
fn scan_null_intolerant<'a>(expr: &'a Expr, out: &mut Vec<&'a Attribute>) {
    match expr {
        Expr::Attribute(a) => out.push(a),
        e if e.null_intolerant() => {
            for child in e.children() {
                scan_null_intolerant(child, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strata_core::DataType;

    use super::*;
    use crate::plan::ExpandNode;

    fn relation(names: &[&str]) -> LogicalPlan {
        LogicalPlan::local_relation(names.iter().map(|n| Attribute::new(*n, DataType::Long)).collect())
    }

    fn col(plan: &LogicalPlan, i: usize) -> Expr {
        Expr::attr(&plan.output()[i])
    }

    #[test]
    fn filter_adds_conjuncts_and_not_null() {
        let r = relation(&["a", "b"]);
        let cond = col(&r, 0).gt(Expr::lit(5i64)).and(col(&r, 1).lt(Expr::lit(3i64)));
        let plan = r.clone().filter(cond);
        let c = plan.constraints();
        assert!(c.contains(&col(&r, 0).gt(Expr::lit(5i64))));
        assert!(c.contains(&col(&r, 1).lt(Expr::lit(3i64))));
        assert!(c.contains(&col(&r, 0).is_not_null()));
        assert!(c.contains(&col(&r, 1).is_not_null()));
        assert_eq!(c.len(), 4);
    }

    #[test]
    fn correlated_conjuncts_are_skipped() {
        let r = relation(&["a"]);
        let outer = Attribute::new("o", DataType::Long);
        let cond = col(&r, 0).eq(Expr::outer(&outer));
        let plan = r.filter(cond);
        assert!(plan.valid_constraints().is_empty());
    }

    #[test]
    fn equalities_substitute() {
        let r = relation(&["a", "b"]);
        let cond = col(&r, 0).eq(col(&r, 1)).and(col(&r, 0).gt(Expr::lit(1i64)));
        let plan = r.clone().filter(cond);
        assert!(plan.constraints().contains(&col(&r, 1).gt(Expr::lit(1i64))));
    }

    #[test]
    fn project_propagates_through_alias() {
        let r = relation(&["a"]);
        let filtered = r.clone().filter(col(&r, 0).gt(Expr::lit(5i64)));
        let alias = col(&r, 0).alias("x");
        let x = alias.to_attribute().unwrap();
        let one = Expr::lit(1i64).alias("one");
        let one_attr = one.to_attribute().unwrap();
        let plan = filtered.project(vec![alias, one]);
        let c = plan.constraints();
        assert!(c.contains(&Expr::attr(&x).gt(Expr::lit(5i64))));
        assert!(c.contains(&Expr::attr(&one_attr).eq_null_safe(Expr::lit(1i64))));
        // `a` is not in the output any more
        assert!(!c.contains(&col(&r, 0).gt(Expr::lit(5i64))));
    }

    #[test]
    fn join_constraint_table() {
        let l = relation(&["a"]);
        let r = relation(&["b"]);
        let lf = l.clone().filter(col(&l, 0).gt(Expr::lit(0i64)));
        let rf = r.clone().filter(col(&r, 0).gt(Expr::lit(0i64)));
        let l_pred = col(&l, 0).gt(Expr::lit(0i64));
        let r_pred = col(&r, 0).gt(Expr::lit(0i64));

        let join = |t: JoinType, cond: Option<Expr>| lf.clone().join(rf.clone(), t, cond);
        let on = Some(col(&l, 0).eq(col(&r, 0)));

        let inner = join(JoinType::Inner, on.clone());
        assert!(inner.constraints().contains(&l_pred) && inner.constraints().contains(&r_pred));
        assert!(inner.constraints().contains(&col(&l, 0).eq(col(&r, 0))));

        let left = join(JoinType::LeftOuter, on.clone());
        assert!(left.constraints().contains(&l_pred) && !left.constraints().contains(&r_pred));

        let right = join(JoinType::RightOuter, on.clone());
        assert!(!right.constraints().contains(&l_pred) && right.constraints().contains(&r_pred));

        assert!(join(JoinType::FullOuter, on.clone()).valid_constraints().is_empty());
        assert!(join(JoinType::LeftAnti, on.clone()).constraints().contains(&l_pred));
        assert!(join(JoinType::Cross, None).constraints().contains(&r_pred));
    }

    #[test]
    fn semi_and_existence_joins_keep_left_constraints() {
        let l = relation(&["a"]);
        let r = relation(&["b"]);
        let lf = l.clone().filter(col(&l, 0).gt(Expr::lit(0i64)));
        let rf = r.clone().filter(col(&r, 0).lt(Expr::lit(9i64)));
        let l_pred = col(&l, 0).gt(Expr::lit(0i64));
        let r_pred = col(&r, 0).lt(Expr::lit(9i64));
        let eq = col(&l, 0).eq(col(&r, 0));

        let semi = lf.clone().join(rf.clone(), JoinType::LeftSemi, Some(eq.clone()));
        assert!(semi.valid_constraints().contains(&eq));
        assert!(semi.valid_constraints().contains(&l_pred));
        assert!(!semi.valid_constraints().contains(&r_pred));
        assert!(semi.constraints().contains(&l_pred));

        let bare_semi = lf.clone().join(rf.clone(), JoinType::LeftSemi, None);
        assert!(!bare_semi.valid_constraints().contains(&eq));
        assert!(bare_semi.constraints().contains(&l_pred));

        let marker = Attribute::not_null("exists", DataType::Boolean);
        let existence = lf.join(rf, JoinType::ExistenceJoin(marker), Some(eq.clone()));
        assert!(existence.constraints().contains(&l_pred));
        assert!(!existence.valid_constraints().contains(&eq));
        assert!(!existence.valid_constraints().contains(&r_pred));
    }

    #[test]
    fn intersect_rewrites_right_onto_left() {
        let l = relation(&["a"]);
        let r = relation(&["b"]);
        let lf = l.clone().filter(col(&l, 0).gt(Expr::lit(0i64)));
        let rf = r.clone().filter(col(&r, 0).lt(Expr::lit(9i64)));

        let plan = lf.intersect(rf, false);
        let c = plan.constraints();
        assert!(c.contains(&col(&l, 0).gt(Expr::lit(0i64))));
        assert!(c.contains(&col(&l, 0).lt(Expr::lit(9i64))));
        assert!(!plan.valid_constraints().contains(&col(&r, 0).lt(Expr::lit(9i64))));
    }

    #[test]
    fn except_keeps_left_constraints_only() {
        let l = relation(&["a"]);
        let r = relation(&["b"]);
        let lf = l.clone().filter(col(&l, 0).gt(Expr::lit(0i64)));
        let rf = r.clone().filter(col(&r, 0).lt(Expr::lit(9i64)));

        let plan = lf.except(rf, false);
        assert!(plan.constraints().contains(&col(&l, 0).gt(Expr::lit(0i64))));
        assert!(!plan.valid_constraints().contains(&col(&l, 0).lt(Expr::lit(9i64))));
        assert!(!plan.valid_constraints().contains(&col(&r, 0).lt(Expr::lit(9i64))));
    }

    #[test]
    fn aggregate_skips_aggregate_function_terms() {
        let r = relation(&["a", "v"]);
        let filtered = r.clone().filter(col(&r, 0).gt(Expr::lit(1i64)));
        let group = col(&r, 0).alias("g");
        let g = group.to_attribute().unwrap();
        let total = Expr::aggregate("sum", vec![col(&r, 1)], DataType::Long).alias("total");
        let total_attr = total.to_attribute().unwrap();

        let plan = filtered.aggregate(vec![col(&r, 0)], vec![group, total]);
        assert!(plan.constraints().contains(&Expr::attr(&g).gt(Expr::lit(1i64))));
        assert!(!plan.valid_constraints().iter().any(|c| c.references().contains(&total_attr)));
    }

    #[test]
    fn union_loosens_single_column_predicates() {
        let a = relation(&["a"]);
        let b = relation(&["b"]);
        let gt = col(&a, 0).gt(Expr::lit(5i64));
        let lt = col(&b, 0).lt(Expr::lit(2i64));
        let union = a.clone().filter(gt.clone()).union_all(b.clone().filter(lt));

        let loosened = gt.or(col(&a, 0).lt(Expr::lit(2i64)));
        assert!(union.constraints().contains(&loosened));
        assert!(union.constraints().contains(&col(&a, 0).is_not_null()));
        assert!(!union.constraints().contains(&col(&a, 0).gt(Expr::lit(5i64))));
    }

    #[test]
    fn expand_has_no_constraints() {
        let r = relation(&["a"]);
        let filtered = r.clone().filter(col(&r, 0).gt(Expr::lit(5i64)));
        let expand = LogicalPlan::unary(
            UnaryOperator::Expand(ExpandNode::new(vec![vec![col(&r, 0)]], r.output().to_vec())),
            filtered,
        );
        assert!(expand.constraints().is_empty());
    }

    #[test]
    fn rewrite_requires_equal_lengths() {
        let a = relation(&["a", "b"]);
        let b = relation(&["c"]);
        let err = rewrite_constraints(a.output(), b.output(), &ExpressionSet::new()).unwrap_err();
        assert_eq!(err, PlanError::AttributeCountMismatch { operation: "rewrite_constraints", expected: 2, actual: 1 });

        let set: ExpressionSet = [col(&b, 0).gt(Expr::lit(1i64))].into_iter().collect();
        let c = relation(&["z"]);
        let rewritten = rewrite_constraints(c.output(), b.output(), &set).unwrap();
        assert!(rewritten.contains(&col(&c, 0).gt(Expr::lit(1i64))));
    }

    #[test]
    fn non_nullable_output_is_not_null() {
        let r = LogicalPlan::local_relation(vec![Attribute::not_null("k", DataType::Long)]);
        assert!(r.constraints().contains(&col(&r, 0).is_not_null()));
    }
}
