//! Repartition operators and the partitioning descriptor they expose.

use std::fmt;

use strata_core::SessionConfig;
use tracing::debug;

use crate::error::{PlanError, PlanResult};
use crate::expr::Expr;

/// How rows are distributed across partitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Partitioning {
    /// Everything in one partition.
    Single,
    /// Rows dealt out evenly over `n` partitions.
    RoundRobin(usize),
    /// Rows hashed on the expressions into `n` partitions.
    Hash(Vec<Expr>, usize),
    /// Rows split into `n` sorted ranges by the sort orders.
    Range(Vec<Expr>, usize),
}

impl Partitioning {
    /// Number of partitions.
    #[must_use]
    pub fn num_partitions(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::RoundRobin(n) | Self::Hash(_, n) | Self::Range(_, n) => *n,
        }
    }
}

impl fmt::Display for Partitioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |exprs: &[Expr]| exprs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        match self {
            Self::Single => write!(f, "SinglePartition"),
            Self::RoundRobin(n) => write!(f, "RoundRobinPartitioning({n})"),
            Self::Hash(exprs, n) => write!(f, "HashPartitioning([{}], {n})", list(exprs)),
            Self::Range(orders, n) => write!(f, "RangePartitioning([{}], {n})", list(orders)),
        }
    }
}

fn positive_partitions(n: i64) -> PlanResult<usize> {
    usize::try_from(n).ok().filter(|n| *n > 0).ok_or(PlanError::NonPositivePartitions(n))
}

/// Changes the number of partitions, with or without a shuffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepartitionNode {
    /// Target partition count.
    pub num_partitions: usize,
    /// Whether rows are shuffled (false means partitions are coalesced).
    pub shuffle: bool,
}

impl RepartitionNode {
    /// Creates a repartition.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::NonPositivePartitions`] if `num_partitions < 1`.
    pub fn new(num_partitions: i64, shuffle: bool) -> PlanResult<Self> {
        Ok(Self { num_partitions: positive_partitions(num_partitions)?, shuffle })
    }

    /// The partitioning of a shuffling repartition. Coalescing has none.
    #[must_use]
    pub fn partitioning(&self) -> Option<Partitioning> {
        if !self.shuffle {
            return None;
        }
        Some(if self.num_partitions == 1 { Partitioning::Single } else { Partitioning::RoundRobin(self.num_partitions) })
    }
}

/// Repartitions by hash or range of expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct RepartitionByExpressionNode {
    /// Either all sort orders (range) or none (hash). May be empty.
    pub partition_expressions: Vec<Expr>,
    /// Target partition count.
    pub num_partitions: usize,
}

impl RepartitionByExpressionNode {
    /// Creates a repartition; without an explicit count the session's
    /// shuffle partition count is used.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::NonPositivePartitions`] for a count below one and
    /// [`PlanError::MixedPartitionExpressions`] if sort orders and plain
    /// expressions are mixed.
    pub fn new(
        partition_expressions: Vec<Expr>,
        num_partitions: Option<i64>,
        config: &SessionConfig,
    ) -> PlanResult<Self> {
        let num_partitions = match num_partitions {
            Some(n) => positive_partitions(n)?,
            None => {
                debug!(
                    num_partitions = config.num_shuffle_partitions,
                    "repartition has no partition count; using the session default"
                );
                positive_partitions(i64::try_from(config.num_shuffle_partitions).unwrap_or(i64::MAX))?
            }
        };
        let sort_orders = partition_expressions.iter().filter(|e| e.is_sort_order()).count();
        if sort_orders != 0 && sort_orders != partition_expressions.len() {
            let listed = partition_expressions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            return Err(PlanError::MixedPartitionExpressions(listed));
        }
        Ok(Self { partition_expressions, num_partitions })
    }

    /// The partitioning this operator produces.
    ///
    /// A single partition wins over everything; otherwise no expressions
    /// means round robin, sort orders mean range and anything else hash.
    #[must_use]
    pub fn partitioning(&self) -> Partitioning {
        let n = self.num_partitions;
        if n == 1 {
            Partitioning::Single
        } else if self.partition_expressions.is_empty() {
            Partitioning::RoundRobin(n)
        } else if self.partition_expressions.iter().all(Expr::is_sort_order) {
            Partitioning::Range(self.partition_expressions.clone(), n)
        } else {
            Partitioning::Hash(self.partition_expressions.clone(), n)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strata_core::DataType;

    use super::*;
    use crate::expr::Attribute;

    fn cfg(n: usize) -> SessionConfig {
        SessionConfig { num_shuffle_partitions: n, ..SessionConfig::default() }
    }

    #[test]
    fn by_expression_partitioning_kinds() {
        let a = Attribute::new("a", DataType::Long);
        let hash = RepartitionByExpressionNode::new(vec![Expr::attr(&a)], Some(4), &cfg(200)).unwrap();
        assert_eq!(hash.partitioning(), Partitioning::Hash(vec![Expr::attr(&a)], 4));

        let range = RepartitionByExpressionNode::new(vec![Expr::attr(&a).asc()], Some(4), &cfg(200)).unwrap();
        assert!(matches!(range.partitioning(), Partitioning::Range(_, 4)));

        let rr = RepartitionByExpressionNode::new(vec![], Some(4), &cfg(200)).unwrap();
        assert_eq!(rr.partitioning(), Partitioning::RoundRobin(4));

        for exprs in [vec![], vec![Expr::attr(&a)], vec![Expr::attr(&a).desc()]] {
            let single = RepartitionByExpressionNode::new(exprs, Some(1), &cfg(200)).unwrap();
            assert_eq!(single.partitioning(), Partitioning::Single);
        }
    }

    #[test]
    fn default_count_comes_from_config() {
        let node = RepartitionByExpressionNode::new(vec![], None, &cfg(16)).unwrap();
        assert_eq!(node.num_partitions, 16);
        assert_eq!(node.partitioning().num_partitions(), 16);
    }

    #[test]
    fn zero_default_count_is_rejected() {
        let err = RepartitionByExpressionNode::new(vec![], None, &cfg(0)).unwrap_err();
        assert_eq!(err, PlanError::NonPositivePartitions(0));
    }

    #[test]
    fn rejects_mixed_and_non_positive() {
        let a = Attribute::new("a", DataType::Long);
        let err = RepartitionByExpressionNode::new(vec![Expr::attr(&a), Expr::attr(&a).asc()], None, &cfg(8)).unwrap_err();
        assert!(matches!(err, PlanError::MixedPartitionExpressions(_)));
        assert_eq!(
            RepartitionByExpressionNode::new(vec![], Some(0), &cfg(8)).unwrap_err(),
            PlanError::NonPositivePartitions(0)
        );
        assert_eq!(RepartitionNode::new(-2, true).unwrap_err(), PlanError::NonPositivePartitions(-2));
    }

    #[test]
    fn repartition_partitioning() {
        assert_eq!(RepartitionNode::new(1, true).unwrap().partitioning(), Some(Partitioning::Single));
        assert_eq!(RepartitionNode::new(8, true).unwrap().partitioning(), Some(Partitioning::RoundRobin(8)));
        assert_eq!(RepartitionNode::new(8, false).unwrap().partitioning(), None);
    }
}
