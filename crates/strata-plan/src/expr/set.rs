//! Sets of expressions deduplicated by semantic equality.

use super::Expr;

/// An insertion-ordered set of expressions.
///
/// Membership is decided on canonical forms, so `a + b` and `b + a` are
/// one member. The first inserted spelling is the one kept.
#[derive(Debug, Clone, Default)]
pub struct ExpressionSet {
    // (canonical form, original)
    entries: Vec<(Expr, Expr)>,
}

impl ExpressionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an expression; returns false if a semantically equal one exists.
    pub fn insert(&mut self, expr: Expr) -> bool {
        let canonical = expr.canonicalize();
        if self.entries.iter().any(|(c, _)| *c == canonical) {
            return false;
        }
        self.entries.push((canonical, expr));
        true
    }

    /// Returns true if a semantically equal expression is present.
    #[must_use]
    pub fn contains(&self, expr: &Expr) -> bool {
        let canonical = expr.canonicalize();
        self.contains_canonical(&canonical)
    }

    fn contains_canonical(&self, canonical: &Expr) -> bool {
        self.entries.iter().any(|(c, _)| c == canonical)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.entries.iter().map(|(_, e)| e)
    }

    /// Members of either set.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (canonical, expr) in &other.entries {
            if !out.contains_canonical(canonical) {
                out.entries.push((canonical.clone(), expr.clone()));
            }
        }
        out
    }

    /// Members of both sets, in this set's order.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self { entries: self.entries.iter().filter(|(c, _)| other.contains_canonical(c)).cloned().collect() }
    }

    /// Members of this set not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self { entries: self.entries.iter().filter(|(c, _)| !other.contains_canonical(c)).cloned().collect() }
    }

    /// Applies `f` to every member, deduplicating the results.
    #[must_use]
    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Self {
        self.iter().map(f).collect()
    }

    /// Keeps the members satisfying `pred`.
    #[must_use]
    pub fn filter(&self, mut pred: impl FnMut(&Expr) -> bool) -> Self {
        Self { entries: self.entries.iter().filter(|(_, e)| pred(e)).cloned().collect() }
    }
}

impl PartialEq for ExpressionSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries.iter().all(|(c, _)| other.contains_canonical(c))
    }
}

impl Extend<Expr> for ExpressionSet {
    fn extend<I: IntoIterator<Item = Expr>>(&mut self, iter: I) {
        for expr in iter {
            self.insert(expr);
        }
    }
}

impl FromIterator<Expr> for ExpressionSet {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for ExpressionSet {
    type Item = Expr;
    type IntoIter = std::iter::Map<std::vec::IntoIter<(Expr, Expr)>, fn((Expr, Expr)) -> Expr>;

    fn into_iter(self) -> Self::IntoIter {
        fn original((_, expr): (Expr, Expr)) -> Expr {
            expr
        }
        self.entries.into_iter().map(original as fn((Expr, Expr)) -> Expr)
    }
}
