//! Plan canonicalization.
//!
//! The canonical form of a plan is what [`LogicalPlan::same_result`]
//! compares. It is built in three passes:
//!
//! 1. Cosmetic nodes go: hints are dropped and views are replaced by
//!    their definitions. A view whose definition is only a projection that
//!    casts every column to its own type under its own name loses that
//!    projection too; references to the projection's columns are
//!    redirected to the columns underneath.
//! 2. Every attribute identity is renumbered. Identities defined in the
//!    plan (aliases, then new output columns) are numbered in post-order;
//!    identities that come from outside (outer references) follow, in their
//!    original order.
//! 3. Expressions are canonicalized with the new identities.
//!
//! Two plans built independently from the same query therefore have equal
//! canonical forms, and canonicalizing a canonical plan changes nothing.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::ExprId;
use tracing::debug;

use super::join::{JoinHint, JoinNode};
use super::node::{
    operator_expressions, stored_attributes, BinaryOperator, LogicalPlan, PlanKind, UnaryOperator,
};
use crate::expr::{Attribute, Expr};

impl LogicalPlan {
    /// Returns the canonical form of this plan. The result carries no tags.
    #[must_use]
    pub fn canonicalized(&self) -> LogicalPlan {
        let mut redirects = BTreeMap::new();
        let stripped = strip_cosmetics(self, &mut redirects);

        let mut numbering = Numbering { redirects, ..Numbering::default() };
        numbering.collect(&stripped);
        let ids = numbering.finish();

        let mut canonicalize = |e: Expr| {
            e.transform_up(&mut |e| renumber(e, &ids)).canonicalize()
        };
        rebuild(&stripped, &mut canonicalize)
    }

    /// Returns true if both plans always produce the same rows.
    #[must_use]
    pub fn same_result(&self, other: &LogicalPlan) -> bool {
        self.canonicalized() == other.canonicalized()
    }
}

// ========== Pass 1: cosmetics ==========

fn strip_cosmetics(plan: &LogicalPlan, redirects: &mut BTreeMap<ExprId, ExprId>) -> LogicalPlan {
    let kind = match plan.kind() {
        PlanKind::Unary { op: UnaryOperator::View(view), child } => {
            if let PlanKind::Unary { op: UnaryOperator::Project(project), child: inner } = child.kind() {
                if child.resolved() && is_identity_projection(&project.project_list, inner.output()) {
                    debug!(view = %view.desc.qualified_name(), "dropping identity projection of view");
                    for (expr, attr) in project.project_list.iter().zip(inner.output()) {
                        if let Some(out) = expr.to_attribute() {
                            redirects.insert(out.expr_id, attr.expr_id);
                        }
                    }
                    return strip_cosmetics(inner, redirects);
                }
            }
            return strip_cosmetics(child, redirects);
        }
        PlanKind::Unary { op: UnaryOperator::ResolvedHint(_), child } => return strip_cosmetics(child, redirects),
        PlanKind::Leaf(op) => PlanKind::Leaf(op.clone()),
        PlanKind::Unary { op, child } => {
            PlanKind::Unary { op: op.clone(), child: Box::new(strip_cosmetics(child, redirects)) }
        }
        PlanKind::Binary { op, left, right } => {
            let op = match op {
                BinaryOperator::Join(join) => {
                    BinaryOperator::Join(JoinNode { hint: JoinHint::none(), ..join.clone() })
                }
                other => other.clone(),
            };
            let left = Box::new(strip_cosmetics(left, redirects));
            PlanKind::Binary { op, left, right: Box::new(strip_cosmetics(right, redirects)) }
        }
        PlanKind::Nary { op, children } => PlanKind::Nary {
            op: op.clone(),
            children: children.iter().map(|c| strip_cosmetics(c, redirects)).collect(),
        },
    };
    LogicalPlan::derive(kind)
}

/// A projection whose every entry passes the child column at the same
/// position through unchanged, up to a cast to its own type and an alias
/// with its own name.
fn is_identity_projection(list: &[Expr], child_output: &[Attribute]) -> bool {
    list.len() == child_output.len()
        && list.iter().zip(child_output).all(|(expr, column)| {
            let (inner, name) = match expr {
                Expr::Alias { child, name, .. } => (child.as_ref(), Some(name)),
                other => (other, None),
            };
            let inner = match inner {
                Expr::Cast { child, data_type, .. } if *data_type == column.data_type => child.as_ref(),
                other => other,
            };
            matches!(inner, Expr::Attribute(a)
                if a.expr_id == column.expr_id
                    && a.data_type == column.data_type
                    && name.map_or(true, |n| *n == column.name))
        })
}

// ========== Pass 2: numbering ==========

#[derive(Default)]
struct Numbering {
    redirects: BTreeMap<ExprId, ExprId>,
    defined: Vec<ExprId>,
    seen: BTreeSet<ExprId>,
    referenced: BTreeSet<ExprId>,
}

impl Numbering {
    fn resolve(&self, mut id: ExprId) -> ExprId {
        while let Some(next) = self.redirects.get(&id) {
            id = *next;
        }
        id
    }

    fn define(&mut self, id: ExprId) {
        let id = self.resolve(id);
        if self.seen.insert(id) {
            self.defined.push(id);
        }
    }

    fn reference(&mut self, id: ExprId) {
        let id = self.resolve(id);
        self.referenced.insert(id);
    }

    fn collect(&mut self, plan: &LogicalPlan) {
        for child in plan.children() {
            self.collect(child);
        }
        for expr in operator_expressions(plan.kind()) {
            self.visit(expr);
        }
        for attr in stored_attributes(plan.kind()) {
            self.reference(attr.expr_id);
        }
        let children = plan.children();
        for attr in plan.output() {
            if !children.iter().any(|c| c.output_set().contains(attr)) {
                self.define(attr.expr_id);
            }
        }
    }

    fn visit(&mut self, expr: &Expr) {
        match expr {
            Expr::Alias { expr_id, .. } => self.define(*expr_id),
            Expr::Attribute(a) | Expr::OuterReference(a) => self.reference(a.expr_id),
            _ => {}
        }
        for child in expr.children() {
            self.visit(child);
        }
    }

    /// Maps every identity to its canonical number.
    fn finish(self) -> CanonicalIds {
        let number = |n: usize| u64::try_from(n).unwrap_or(u64::MAX);
        let mut ids: BTreeMap<ExprId, ExprId> = BTreeMap::new();
        for (n, id) in self.defined.iter().enumerate() {
            ids.insert(*id, ExprId::new(number(n)));
        }
        let base = self.defined.len();
        let free = self.referenced.iter().filter(|id| !self.seen.contains(id));
        for (n, id) in free.enumerate() {
            ids.insert(*id, ExprId::new(number(base + n)));
        }
        CanonicalIds { redirects: self.redirects, ids }
    }
}

struct CanonicalIds {
    redirects: BTreeMap<ExprId, ExprId>,
    ids: BTreeMap<ExprId, ExprId>,
}

impl CanonicalIds {
    fn get(&self, mut id: ExprId) -> ExprId {
        while let Some(next) = self.redirects.get(&id) {
            id = *next;
        }
        self.ids.get(&id).copied().unwrap_or(id)
    }
}

// ========== Pass 3: rebuild ==========

fn renumber(expr: Expr, ids: &CanonicalIds) -> Expr {
    match expr {
        Expr::Attribute(a) => {
            let id = ids.get(a.expr_id);
            Expr::Attribute(a.with_expr_id(id))
        }
        Expr::OuterReference(a) => {
            let id = ids.get(a.expr_id);
            Expr::OuterReference(a.with_expr_id(id))
        }
        Expr::Alias { child, name, expr_id, qualifier } => {
            Expr::Alias { child, name, expr_id: ids.get(expr_id), qualifier }
        }
        other => other,
    }
}

fn rebuild(plan: &LogicalPlan, f: &mut dyn FnMut(Expr) -> Expr) -> LogicalPlan {
    let kind = match plan.kind() {
        PlanKind::Leaf(op) => PlanKind::Leaf(op.clone().map_expressions(f)),
        PlanKind::Unary { op, child } => {
            let child = Box::new(rebuild(child, f));
            PlanKind::Unary { op: op.clone().map_expressions(f), child }
        }
        PlanKind::Binary { op, left, right } => {
            let left = Box::new(rebuild(left, f));
            let right = Box::new(rebuild(right, f));
            PlanKind::Binary { op: op.clone().map_expressions(f), left, right }
        }
        PlanKind::Nary { op, children } => {
            PlanKind::Nary { op: op.clone(), children: children.iter().map(|c| rebuild(c, f)).collect() }
        }
    };
    LogicalPlan::derive(kind)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strata_core::DataType;

    use super::*;
    use crate::plan::{CatalogTable, HintInfo, JoinType, ViewNode};

    fn relation() -> LogicalPlan {
        LogicalPlan::local_relation(vec![Attribute::new("a", DataType::Long), Attribute::new("b", DataType::Long)])
    }

    fn query() -> LogicalPlan {
        let r = relation();
        let a = Expr::attr(&r.output()[0]);
        let b = Expr::attr(&r.output()[1]);
        r.filter(a.clone().add(b).gt(Expr::lit(1i64))).project(vec![a.alias("x")])
    }

    #[test]
    fn independent_builds_are_the_same() {
        assert!(query().same_result(&query()));
        assert_ne!(query(), query());
    }

    #[test]
    fn commutative_operands_do_not_matter() {
        let r = relation();
        let a = Expr::attr(&r.output()[0]);
        let b = Expr::attr(&r.output()[1]);
        let one = r.clone().filter(a.clone().add(b.clone()).gt(Expr::lit(1i64)));
        let two = r.clone().filter(Expr::lit(1i64).lt(b.add(a.clone())));
        assert!(one.same_result(&two));
        let three = r.filter(a.gt(Expr::lit(2i64)));
        assert!(!one.same_result(&three));
    }

    #[test]
    fn idempotent() {
        let once = query().canonicalized();
        assert_eq!(once.canonicalized(), once);
    }

    #[test]
    fn join_hints_are_ignored() {
        let l = relation();
        let r = relation();
        let plain = l.clone().join(r.clone(), JoinType::Inner, None);
        let hinted = l.join_with_hint(
            r,
            JoinType::Inner,
            None,
            JoinHint { left: Some(HintInfo::strategy("broadcast")), right: None },
        );
        assert!(plain.same_result(&hinted));
    }

    #[test]
    fn hint_nodes_are_ignored() {
        let plain = relation().distinct();
        let hinted = relation().hint(HintInfo::strategy("broadcast")).distinct();
        assert!(plain.same_result(&hinted));
        assert!(relation().hint(HintInfo::strategy("merge")).same_result(&relation()));
    }

    #[test]
    fn view_over_identity_cast_is_unwrapped() {
        let r = relation();
        let cols = r.output().to_vec();
        let casts: Vec<Expr> =
            cols.iter().map(|c| Expr::attr(c).cast(c.data_type.clone()).alias(c.name.clone())).collect();
        let view_out: Vec<Attribute> = casts.iter().filter_map(Expr::to_attribute).collect();
        let view = LogicalPlan::unary(
            UnaryOperator::View(ViewNode { desc: CatalogTable::new(vec!["v".into()]), is_temp_view: false }),
            r.clone().project(casts),
        );

        let through_view = view.filter(Expr::attr(&view_out[0]).gt(Expr::lit(0i64)));
        let direct = r.filter(Expr::attr(&cols[0]).gt(Expr::lit(0i64)));
        assert!(through_view.same_result(&direct));
    }

    #[test]
    fn view_keeps_renaming_projection() {
        let r = relation();
        let renamed: Vec<Expr> = r.output().iter().map(|c| Expr::attr(c).alias("other")).collect();
        let view = LogicalPlan::unary(
            UnaryOperator::View(ViewNode { desc: CatalogTable::new(vec!["v".into()]), is_temp_view: true }),
            r.clone().project(renamed),
        );
        assert!(!view.same_result(&r));
    }
}
