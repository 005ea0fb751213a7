//! Join types and the join node.

use std::fmt;

use super::patterns::{TreePattern, TreePatternBits};
use super::relational::HintInfo;
use crate::expr::{Attribute, Expr};

/// Join type for join operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN.
    Inner,
    /// CROSS JOIN.
    Cross,
    /// LEFT OUTER JOIN.
    LeftOuter,
    /// RIGHT OUTER JOIN.
    RightOuter,
    /// FULL OUTER JOIN.
    FullOuter,
    /// LEFT SEMI JOIN (left rows that have a match).
    LeftSemi,
    /// LEFT ANTI JOIN (left rows that have no match).
    LeftAnti,
    /// Left rows plus a boolean marker column saying whether a match exists.
    ExistenceJoin(Attribute),
    /// NATURAL join; must be rewritten into an explicit condition.
    NaturalJoin(Box<JoinType>),
    /// JOIN ... USING; must be rewritten into an explicit condition.
    UsingJoin(Box<JoinType>, Vec<String>),
}

impl JoinType {
    /// Inner and cross joins.
    #[must_use]
    pub const fn is_inner_like(&self) -> bool {
        matches!(self, Self::Inner | Self::Cross)
    }

    /// Left, right and full outer joins.
    #[must_use]
    pub const fn is_outer(&self) -> bool {
        matches!(self, Self::LeftOuter | Self::RightOuter | Self::FullOuter)
    }

    /// Left semi and left anti joins.
    #[must_use]
    pub const fn is_left_semi_or_anti(&self) -> bool {
        matches!(self, Self::LeftSemi | Self::LeftAnti)
    }

    /// Join shapes whose output is the left side only (plus a marker for
    /// existence joins).
    #[must_use]
    pub const fn is_left_existence(&self) -> bool {
        matches!(self, Self::LeftSemi | Self::LeftAnti | Self::ExistenceJoin(_))
    }

    /// Natural and USING joins.
    #[must_use]
    pub const fn is_natural_like(&self) -> bool {
        matches!(self, Self::NaturalJoin(_) | Self::UsingJoin(..))
    }

    pub(crate) fn patterns(&self) -> TreePatternBits {
        let mut bits = TreePatternBits::of(&[TreePattern::Join]);
        if self.is_inner_like() {
            bits.insert(TreePattern::InnerLikeJoin);
        } else if self.is_outer() {
            bits.insert(TreePattern::OuterJoin);
        } else if self.is_left_semi_or_anti() {
            bits.insert(TreePattern::LeftSemiOrAntiJoin);
        } else if self.is_natural_like() {
            bits.insert(TreePattern::NaturalLikeJoin);
        }
        bits
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Cross => write!(f, "CROSS"),
            Self::LeftOuter => write!(f, "LEFT OUTER"),
            Self::RightOuter => write!(f, "RIGHT OUTER"),
            Self::FullOuter => write!(f, "FULL OUTER"),
            Self::LeftSemi => write!(f, "LEFT SEMI"),
            Self::LeftAnti => write!(f, "LEFT ANTI"),
            Self::ExistenceJoin(marker) => write!(f, "EXISTENCE({marker})"),
            Self::NaturalJoin(base) => write!(f, "NATURAL {base}"),
            Self::UsingJoin(base, columns) => write!(f, "{base} USING ({})", columns.join(", ")),
        }
    }
}

/// Hints attached to the two sides of a join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinHint {
    /// Hint on the left input.
    pub left: Option<HintInfo>,
    /// Hint on the right input.
    pub right: Option<HintInfo>,
}

impl JoinHint {
    /// No hints.
    #[must_use]
    pub const fn none() -> Self {
        Self { left: None, right: None }
    }

    /// Returns true if neither side carries a hint.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// A join node.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    /// The type of join.
    pub join_type: JoinType,
    /// The join condition, if any.
    pub condition: Option<Expr>,
    /// Execution hints. Not part of the join's result semantics.
    pub hint: JoinHint,
}

impl JoinNode {
    /// Creates a join without hints.
    #[must_use]
    pub fn new(join_type: JoinType, condition: Option<Expr>) -> Self {
        Self { join_type, condition, hint: JoinHint::none() }
    }

    /// Sets the hints.
    #[must_use]
    pub fn with_hint(mut self, hint: JoinHint) -> Self {
        self.hint = hint;
        self
    }
}

#[cfg(test)]
mod tests {
    use strata_core::DataType;

    use super::*;

    #[test]
    fn classification() {
        assert!(JoinType::Cross.is_inner_like());
        assert!(JoinType::FullOuter.is_outer());
        assert!(JoinType::LeftAnti.is_left_semi_or_anti());
        let marker = Attribute::not_null("exists", DataType::Boolean);
        assert!(JoinType::ExistenceJoin(marker).is_left_existence());
        assert!(!JoinType::LeftOuter.is_left_existence());
        assert!(JoinType::UsingJoin(Box::new(JoinType::Inner), vec!["id".into()]).is_natural_like());
    }

    #[test]
    fn patterns_by_type() {
        assert!(JoinType::Inner.patterns().contains_all(&[TreePattern::Join, TreePattern::InnerLikeJoin]));
        assert!(JoinType::RightOuter.patterns().contains(TreePattern::OuterJoin));
        assert!(JoinType::LeftSemi.patterns().contains(TreePattern::LeftSemiOrAntiJoin));
        assert!(JoinType::NaturalJoin(Box::new(JoinType::Inner)).patterns().contains(TreePattern::NaturalLikeJoin));
        let marker = Attribute::not_null("exists", DataType::Boolean);
        let existence = JoinType::ExistenceJoin(marker).patterns();
        assert!(existence.contains(TreePattern::Join));
        assert!(!existence.contains(TreePattern::LeftSemiOrAntiJoin));
    }

    #[test]
    fn display() {
        assert_eq!(JoinType::LeftOuter.to_string(), "LEFT OUTER");
        assert_eq!(
            JoinType::UsingJoin(Box::new(JoinType::Inner), vec!["a".into(), "b".into()]).to_string(),
            "INNER USING (a, b)"
        );
    }
}
