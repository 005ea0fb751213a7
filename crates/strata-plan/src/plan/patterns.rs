//! Tree pattern tags.
//!
//! Every plan node publishes the set of patterns it matches, and every node
//! also carries the union of its subtree's patterns. A rewrite rule that only
//! fires on joins can skip any subtree whose pattern set lacks
//! [`TreePattern::Join`] without visiting it.

use std::fmt;

/// A shape tag for plan nodes and expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TreePattern {
    // Plan node patterns
    /// A projection.
    Project,
    /// A filter.
    Filter,
    /// Any join.
    Join,
    /// An inner or cross join.
    InnerLikeJoin,
    /// A left, right or full outer join.
    OuterJoin,
    /// A left semi or left anti join.
    LeftSemiOrAntiJoin,
    /// A natural or USING join awaiting rewrite.
    NaturalLikeJoin,
    /// An aggregation.
    Aggregate,
    /// A window operator.
    Window,
    /// A sort.
    Sort,
    /// A global or local limit.
    Limit,
    /// A union.
    Union,
    /// An intersect.
    Intersect,
    /// An except.
    Except,
    /// DISTINCT or deduplication.
    DistinctLike,
    /// A generator application.
    Generate,
    /// A repartition.
    RepartitionOperation,
    /// An inline relation.
    LocalRelation,
    /// A numeric range.
    Range,
    /// A subquery alias.
    SubqueryAlias,
    /// A grouping-set expansion.
    Expand,
    /// A pivot awaiting rewrite.
    Pivot,
    /// A sample.
    Sample,
    /// A view.
    View,
    /// A CTE definition, reference or scope.
    Cte,
    /// A metrics collection point.
    CollectMetrics,
    /// An offset.
    Offset,
    /// A tail.
    Tail,
    /// A resolved hint.
    Hint,
    /// A relation not yet bound to the catalog.
    UnresolvedRelation,

    // Expression patterns
    /// An aggregate function call.
    AggregateExpression,
    /// A window expression.
    WindowExpression,
    /// A generator.
    Generator,
    /// An outer reference.
    OuterReference,
    /// A subquery expression.
    SubqueryExpression,
    /// A literal.
    Literal,
    /// An alias.
    Alias,
    /// A cast.
    Cast,
}

impl TreePattern {
    /// Every pattern, in declaration order.
    pub const ALL: [Self; 38] = [
        Self::Project,
        Self::Filter,
        Self::Join,
        Self::InnerLikeJoin,
        Self::OuterJoin,
        Self::LeftSemiOrAntiJoin,
        Self::NaturalLikeJoin,
        Self::Aggregate,
        Self::Window,
        Self::Sort,
        Self::Limit,
        Self::Union,
        Self::Intersect,
        Self::Except,
        Self::DistinctLike,
        Self::Generate,
        Self::RepartitionOperation,
        Self::LocalRelation,
        Self::Range,
        Self::SubqueryAlias,
        Self::Expand,
        Self::Pivot,
        Self::Sample,
        Self::View,
        Self::Cte,
        Self::CollectMetrics,
        Self::Offset,
        Self::Tail,
        Self::Hint,
        Self::UnresolvedRelation,
        Self::AggregateExpression,
        Self::WindowExpression,
        Self::Generator,
        Self::OuterReference,
        Self::SubqueryExpression,
        Self::Literal,
        Self::Alias,
        Self::Cast,
    ];

    const fn bit(self) -> u64 {
        1 << (self as u8)
    }

    /// The upper-snake-case tag name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Project => "PROJECT",
            Self::Filter => "FILTER",
            Self::Join => "JOIN",
            Self::InnerLikeJoin => "INNER_LIKE_JOIN",
            Self::OuterJoin => "OUTER_JOIN",
            Self::LeftSemiOrAntiJoin => "LEFT_SEMI_OR_ANTI_JOIN",
            Self::NaturalLikeJoin => "NATURAL_LIKE_JOIN",
            Self::Aggregate => "AGGREGATE",
            Self::Window => "WINDOW",
            Self::Sort => "SORT",
            Self::Limit => "LIMIT",
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
            Self::DistinctLike => "DISTINCT_LIKE",
            Self::Generate => "GENERATE",
            Self::RepartitionOperation => "REPARTITION_OPERATION",
            Self::LocalRelation => "LOCAL_RELATION",
            Self::Range => "RANGE",
            Self::SubqueryAlias => "SUBQUERY_ALIAS",
            Self::Expand => "EXPAND",
            Self::Pivot => "PIVOT",
            Self::Sample => "SAMPLE",
            Self::View => "VIEW",
            Self::Cte => "CTE",
            Self::CollectMetrics => "COLLECT_METRICS",
            Self::Offset => "OFFSET",
            Self::Tail => "TAIL",
            Self::Hint => "HINT",
            Self::UnresolvedRelation => "UNRESOLVED_RELATION",
            Self::AggregateExpression => "AGGREGATE_EXPRESSION",
            Self::WindowExpression => "WINDOW_EXPRESSION",
            Self::Generator => "GENERATOR",
            Self::OuterReference => "OUTER_REFERENCE",
            Self::SubqueryExpression => "SUBQUERY_EXPRESSION",
            Self::Literal => "LITERAL",
            Self::Alias => "ALIAS",
            Self::Cast => "CAST",
        }
    }
}

impl fmt::Display for TreePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`TreePattern`]s packed into a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TreePatternBits(u64);

impl TreePatternBits {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A set of the given patterns.
    #[must_use]
    pub fn of(patterns: &[TreePattern]) -> Self {
        let mut bits = Self::empty();
        for p in patterns {
            bits.insert(*p);
        }
        bits
    }

    /// Adds a pattern.
    pub fn insert(&mut self, pattern: TreePattern) {
        self.0 |= pattern.bit();
    }

    /// Returns true if the pattern is present.
    #[must_use]
    pub const fn contains(self, pattern: TreePattern) -> bool {
        self.0 & pattern.bit() != 0
    }

    /// Returns true if any of the patterns is present.
    #[must_use]
    pub fn contains_any(self, patterns: &[TreePattern]) -> bool {
        patterns.iter().any(|p| self.contains(*p))
    }

    /// Returns true if all of the patterns are present.
    #[must_use]
    pub fn contains_all(self, patterns: &[TreePattern]) -> bool {
        patterns.iter().all(|p| self.contains(*p))
    }

    /// The union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if no pattern is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the present patterns in declaration order.
    pub fn iter(self) -> impl Iterator<Item = TreePattern> {
        TreePattern::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl FromIterator<TreePattern> for TreePatternBits {
    fn from_iter<I: IntoIterator<Item = TreePattern>>(iter: I) -> Self {
        let mut bits = Self::empty();
        for p in iter {
            bits.insert(p);
        }
        bits
    }
}

impl fmt::Display for TreePatternBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, p) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_distinct() {
        let all: TreePatternBits = TreePattern::ALL.into_iter().collect();
        assert_eq!(all.iter().count(), TreePattern::ALL.len());
    }

    #[test]
    fn set_operations() {
        let joins = TreePatternBits::of(&[TreePattern::Join, TreePattern::InnerLikeJoin]);
        let filter = TreePatternBits::of(&[TreePattern::Filter]);
        let both = joins.union(filter);
        assert!(both.contains_all(&[TreePattern::Join, TreePattern::Filter]));
        assert!(!joins.contains_any(&[TreePattern::Filter, TreePattern::Sort]));
        assert!(TreePatternBits::empty().is_empty());
        assert_eq!(filter.to_string(), "[FILTER]");
    }
}
