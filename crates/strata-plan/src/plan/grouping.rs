//! Grouping-set expansion.
//!
//! `GROUP BY CUBE/ROLLUP/GROUPING SETS` is planned as an [`ExpandNode`] that
//! emits every input row once per grouping set. Grouping columns that are
//! not part of a set are replaced by NULL, and a grouping-id column records
//! which columns were rolled up:
//!
//! ```text
//! group by (a, b, c, d), set (a, c)
//!   bit:      3 2 1 0
//!   column:   a b c d
//!   rolled:   0 1 0 1   => grouping id 0b0101 = 5
//! ```

use std::collections::BTreeSet;

use strata_core::{DataType, ExprId, SessionConfig, Value};

use super::node::{LogicalPlan, UnaryOperator};
use super::relational::ProjectNode;
use crate::error::{PlanError, PlanResult};
use crate::expr::{Attribute, AttributeMap, Expr};

/// Name of the grouping-id column.
pub const GROUPING_ID_NAME: &str = "_grouping_id";

/// Name of the column that tells duplicate grouping sets apart.
pub const GROUPING_POSITION_NAME: &str = "_gen_grouping_pos";

/// Creates the grouping-id attribute, `INT` or `BIGINT` per configuration.
#[must_use]
pub fn grouping_id_attribute(config: &SessionConfig) -> Attribute {
    let data_type = if config.integer_grouping_id { DataType::Integer } else { DataType::Long };
    Attribute::not_null(GROUPING_ID_NAME, data_type)
}

/// Computes the grouping id of one grouping set.
///
/// Bit `N - 1 - i` (for `N` grouping attributes) is cleared when attribute
/// `i` is in the set and set otherwise.
///
/// # Errors
///
/// Returns [`PlanError::TooManyGroupingAttributes`] if there are more
/// grouping attributes than `bit_width`, and
/// [`PlanError::UnknownGroupingAttribute`] if the set names an attribute
/// that is not a grouping attribute.
pub fn build_bitmask(group_by_attrs: &[Attribute], grouping_set: &[Attribute], bit_width: usize) -> PlanResult<u64> {
    let n = group_by_attrs.len();
    let max = bit_width.min(64);
    if n > max {
        return Err(PlanError::TooManyGroupingAttributes { count: n, max });
    }
    let positions: AttributeMap<usize> = group_by_attrs.iter().enumerate().map(|(i, a)| (a, i)).collect();

    let mut mask = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
    for attr in grouping_set {
        let index = positions.get(attr).ok_or_else(|| PlanError::UnknownGroupingAttribute(attr.to_string()))?;
        mask &= !(1u64 << (n - 1 - index));
    }
    Ok(mask)
}

/// Emits each input row once per projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandNode {
    /// One projection per emitted copy of a row.
    pub projections: Vec<Vec<Expr>>,
    /// Output columns, one per projection position.
    pub output: Vec<Attribute>,
}

impl ExpandNode {
    /// Creates an expand node.
    #[must_use]
    pub fn new(projections: Vec<Vec<Expr>>, output: Vec<Attribute>) -> Self {
        Self { projections, output }
    }

    /// Plans grouping-set expansion over `child`.
    ///
    /// The result is `Expand(projections, output, Project(child.output ++
    /// group_by_aliases, child))`. Each projection is the child's columns,
    /// then each grouping attribute (or a typed NULL when it is not in the
    /// set), then the grouping id. When two grouping sets name the same
    /// attributes, a `_gen_grouping_pos` column holding the set's position
    /// is appended so that their rows stay apart.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`build_bitmask`], using the bit width of
    /// `gid`'s type.
    pub fn for_grouping_sets(
        grouping_sets: &[Vec<Attribute>],
        group_by_aliases: Vec<Expr>,
        group_by_attrs: &[Attribute],
        gid: &Attribute,
        child: LogicalPlan,
    ) -> PlanResult<LogicalPlan> {
        let bit_width = gid.data_type.default_size() * 8;
        let identities: BTreeSet<BTreeSet<ExprId>> =
            grouping_sets.iter().map(|set| set.iter().map(|a| a.expr_id).collect()).collect();
        let has_duplicate_sets = identities.len() != grouping_sets.len();

        let child_output = child.output().to_vec();
        let mut projections = Vec::with_capacity(grouping_sets.len());
        for (position, set) in grouping_sets.iter().enumerate() {
            let members: BTreeSet<ExprId> = set.iter().map(|a| a.expr_id).collect();
            let mut row: Vec<Expr> = child_output.iter().map(Expr::attr).collect();
            row.extend(group_by_attrs.iter().map(|attr| {
                if members.contains(&attr.expr_id) {
                    Expr::attr(attr)
                } else {
                    Expr::null(attr.data_type.clone())
                }
            }));
            let mask = build_bitmask(group_by_attrs, set, bit_width)?;
            row.push(grouping_id_literal(mask, &gid.data_type));
            if has_duplicate_sets {
                let position = i64::try_from(position).unwrap_or(i64::MAX);
                row.push(Expr::typed_lit(position, DataType::Integer));
            }
            projections.push(row);
        }

        // grouping attributes may now be NULL, so they get new identities
        let mut output = child_output.clone();
        output.extend(group_by_attrs.iter().map(|a| a.new_instance().with_nullability(true)));
        output.push(gid.clone());
        if has_duplicate_sets {
            output.push(Attribute::not_null(GROUPING_POSITION_NAME, DataType::Integer));
        }

        let mut project_list: Vec<Expr> = child_output.iter().map(Expr::attr).collect();
        project_list.extend(group_by_aliases);
        let project = LogicalPlan::unary(UnaryOperator::Project(ProjectNode::new(project_list)), child);
        Ok(LogicalPlan::unary(UnaryOperator::Expand(Self::new(projections, output)), project))
    }
}

fn grouping_id_literal(mask: u64, data_type: &DataType) -> Expr {
    // the id is stored in the low bits of a signed column
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let value = if *data_type == DataType::Integer { i64::from(mask as u32 as i32) } else { mask as i64 };
    Expr::typed_lit(Value::Int(value), data_type.clone())
}

/// A `GROUPING SETS` aggregation awaiting expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingSetsNode {
    /// The grouping sets, each a list of grouping expressions.
    pub selected_group_by_exprs: Vec<Vec<Expr>>,
    /// All grouping expressions.
    pub group_by_exprs: Vec<Expr>,
    /// Output expressions.
    pub aggregations: Vec<Expr>,
}

/// Grouping sets of `CUBE(e1, ..., en)`: every subset, largest first.
#[must_use]
pub fn cube_exprs(exprs: &[Vec<Expr>]) -> Vec<Vec<Expr>> {
    match exprs.split_first() {
        None => vec![Vec::new()],
        Some((first, rest)) => {
            let tail = cube_exprs(rest);
            let with_first = tail.iter().map(|set| first.iter().chain(set.iter()).cloned().collect());
            with_first.chain(tail.iter().cloned()).collect()
        }
    }
}

/// Grouping sets of `ROLLUP(e1, ..., en)`: every prefix, longest first.
#[must_use]
pub fn rollup_exprs(exprs: &[Vec<Expr>]) -> Vec<Vec<Expr>> {
    (0..=exprs.len()).rev().map(|len| exprs[..len].iter().flatten().cloned().collect()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::plan::{LeafOperator, LocalRelationNode, PlanKind};

    fn attrs(names: &[&str]) -> Vec<Attribute> {
        names.iter().map(|n| Attribute::new(*n, DataType::Integer)).collect()
    }

    #[test]
    fn bitmask_of_subset() {
        let g = attrs(&["a", "b", "c", "d"]);
        let set = vec![g[0].clone(), g[2].clone()];
        assert_eq!(build_bitmask(&g, &set, 64).unwrap(), 0b0101);
        assert_eq!(build_bitmask(&g, &[], 64).unwrap(), 0b1111);
        assert_eq!(build_bitmask(&g, &g, 64).unwrap(), 0);
    }

    #[test]
    fn bitmask_full_width() {
        let g: Vec<Attribute> = (0..64).map(|i| Attribute::new(format!("c{i}"), DataType::Integer)).collect();
        assert_eq!(build_bitmask(&g, &[], 64).unwrap(), u64::MAX);
        assert_eq!(build_bitmask(&g, &g[..1], 64).unwrap(), u64::MAX >> 1);
    }

    #[test]
    fn bitmask_errors() {
        let g = attrs(&["a", "b", "c"]);
        assert_eq!(
            build_bitmask(&g, &[], 2).unwrap_err(),
            PlanError::TooManyGroupingAttributes { count: 3, max: 2 }
        );
        let stranger = Attribute::new("z", DataType::Integer);
        assert!(matches!(build_bitmask(&g, &[stranger], 64), Err(PlanError::UnknownGroupingAttribute(_))));
    }

    fn relation(names: &[&str]) -> LogicalPlan {
        LogicalPlan::leaf(LeafOperator::LocalRelation(LocalRelationNode::empty(attrs(names))))
    }

    #[test]
    fn expand_for_rollup() {
        let child = relation(&["a", "b", "v"]);
        let a = child.output()[0].clone();
        let b = child.output()[1].clone();
        let alias_a = Expr::attr(&a).alias("a");
        let alias_b = Expr::attr(&b).alias("b");
        let ga = alias_a.to_attribute().unwrap();
        let gb = alias_b.to_attribute().unwrap();
        let gid = grouping_id_attribute(&SessionConfig::default());
        let sets = vec![vec![ga.clone(), gb.clone()], vec![ga.clone()], vec![]];

        let plan =
            ExpandNode::for_grouping_sets(&sets, vec![alias_a, alias_b], &[ga.clone(), gb.clone()], &gid, child)
                .unwrap();
        let PlanKind::Unary { op: UnaryOperator::Expand(expand), child: project } = plan.kind() else {
            panic!("expected expand, got {plan:?}");
        };
        assert_eq!(expand.projections.len(), 3);
        assert_eq!(expand.projections[0][3], Expr::attr(&ga));
        assert_eq!(expand.projections[1][4], Expr::null(DataType::Integer));
        assert_eq!(expand.projections[2][5], Expr::typed_lit(3i64, DataType::Long));
        assert_eq!(plan.output().len(), 6);
        assert!(plan.output()[3].nullable);
        assert_ne!(plan.output()[3].expr_id, ga.expr_id);
        assert_eq!(plan.output()[5].expr_id, gid.expr_id);
        assert_eq!(project.output().len(), 5);
    }

    #[test]
    fn duplicate_sets_get_position_column() {
        let child = relation(&["k"]);
        let k = child.output()[0].clone();
        let gid = grouping_id_attribute(&SessionConfig { integer_grouping_id: true, ..SessionConfig::default() });
        let sets = vec![vec![k.clone()], vec![k.clone()]];
        let plan = ExpandNode::for_grouping_sets(&sets, vec![], &[k.clone()], &gid, child).unwrap();
        let PlanKind::Unary { op: UnaryOperator::Expand(expand), .. } = plan.kind() else {
            panic!("expected expand");
        };
        assert_eq!(expand.projections[1].last(), Some(&Expr::typed_lit(1i64, DataType::Integer)));
        let last = plan.output().last().unwrap();
        assert_eq!(last.name, GROUPING_POSITION_NAME);
        assert_eq!(gid.data_type, DataType::Integer);
    }

    #[test]
    fn cube_and_rollup_sets() {
        let a = Expr::lit(1i64);
        let b = Expr::lit(2i64);
        let input = vec![vec![a.clone()], vec![b.clone()]];
        assert_eq!(cube_exprs(&input), vec![vec![a.clone(), b.clone()], vec![a.clone()], vec![b.clone()], vec![]]);
        assert_eq!(rollup_exprs(&input), vec![vec![a.clone(), b], vec![a], vec![]]);
    }
}
