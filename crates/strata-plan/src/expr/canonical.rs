//! Expression normalization.
//!
//! Two expressions are semantically equal when their canonical forms are
//! structurally equal. Canonicalization erases cosmetic fields (names,
//! qualifiers, metadata) and puts the operands of commutative operators in a
//! stable order, so that `a + b` and `b + a` compare equal while `a#1` and
//! `a#2` never do.

use super::{BinaryOp, Expr};

impl Expr {
    /// Returns the canonical form of this expression.
    #[must_use]
    pub fn canonicalize(&self) -> Self {
        self.clone().transform_up(&mut normalize)
    }

    /// Returns true if both expressions compute the same value.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.canonicalize() == other.canonicalize()
    }
}

fn normalize(expr: Expr) -> Expr {
    match expr {
        Expr::Attribute(a) => Expr::Attribute(a.canonicalized()),
        Expr::OuterReference(a) => Expr::OuterReference(a.canonicalized()),
        Expr::Alias { child, expr_id, .. } => Expr::Alias { child, name: String::new(), expr_id, qualifier: Vec::new() },
        Expr::Subquery { plan, outer_refs } => Expr::Subquery { plan: Box::new(plan.canonicalized()), outer_refs },
        Expr::Binary { left, op, right } => normalize_binary(*left, op, *right),
        other => other,
    }
}

fn normalize_binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    match op {
        BinaryOp::Add | BinaryOp::Mul => reorder_chain(left, op, right),
        BinaryOp::And | BinaryOp::Or if left.deterministic() && right.deterministic() => {
            reorder_chain(left, op, right)
        }
        BinaryOp::Eq | BinaryOp::EqNullSafe | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt
        | BinaryOp::GtEq => match op.flipped() {
            Some(flipped) if order_key(&left) > order_key(&right) => right.binary(flipped, left),
            _ => left.binary(op, right),
        },
        _ => left.binary(op, right),
    }
}

/// Flattens a chain of one commutative operator and rebuilds it left-deep
/// with the operands sorted.
fn reorder_chain(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let mut operands = Vec::new();
    flatten(left, op, &mut operands);
    flatten(right, op, &mut operands);
    operands.sort_by_cached_key(order_key);

    // Both sides push at least one operand.
    let first = operands.remove(0);
    operands.into_iter().fold(first, |acc, e| acc.binary(op, e))
}

fn flatten(expr: Expr, op: BinaryOp, out: &mut Vec<Expr>) {
    match expr {
        Expr::Binary { left, op: inner, right } if inner == op => {
            flatten(*left, op, out);
            flatten(*right, op, out);
        }
        other => out.push(other),
    }
}

/// Display text alone ties literals that differ only in type.
fn order_key(expr: &Expr) -> (String, String) {
    (expr.to_string(), expr.data_type().to_string())
}
