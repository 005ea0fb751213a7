//! Behavioural tests for `strata-plan`.
//!
//! These tests build plans through the public API and check:
//! - Output schemas of joins, unions and aliases
//! - Row-count bounds
//! - Resolution of projections and placeholder operators
//! - Grouping-set bitmasks, ranges and partitioning
//! - Child replacement and canonical comparison

use strata_core::{DataType, SessionConfig};
use strata_plan::error::PlanError;
use strata_plan::expr::{Attribute, Expr};
use strata_plan::plan::{
    build_bitmask, AliasIdentifier, JoinType, LimitNode, LogicalPlan, Partitioning, PivotNode, RangeNode,
    RepartitionByExpressionNode, SubqueryAliasNode, TreePattern, UnaryOperator,
};

fn relation(columns: &[(&str, bool)]) -> LogicalPlan {
    LogicalPlan::local_relation(
        columns.iter().map(|(name, nullable)| Attribute::new(*name, DataType::Long).with_nullability(*nullable)).collect(),
    )
}

fn rows(n: i64) -> LogicalPlan {
    LogicalPlan::range(0, n, 1).unwrap()
}

fn col(plan: &LogicalPlan, i: usize) -> Expr {
    Expr::attr(&plan.output()[i])
}

// ============================================================================
// Output schema
// ============================================================================

mod output {
    use super::*;

    #[test]
    fn union_nullability_is_any_child() {
        let union = LogicalPlan::union(vec![
            relation(&[("a", false), ("b", false)]),
            relation(&[("a", false), ("b", true)]),
            relation(&[("a", false), ("b", false)]),
        ])
        .unwrap();
        let nullable: Vec<bool> = union.output().iter().map(|a| a.nullable).collect();
        assert_eq!(nullable, vec![false, true]);
    }

    #[test]
    fn union_keeps_first_child_identity() {
        let first = relation(&[("a", false)]);
        let first_id = first.output()[0].expr_id;
        let union = first.union_all(relation(&[("z", true)]));
        assert_eq!(union.output()[0].expr_id, first_id);
        assert_eq!(union.output()[0].name, "a");
    }

    #[test]
    fn left_outer_forces_right_nullable() {
        let left = relation(&[("a", false)]);
        let right = relation(&[("b", false), ("c", false)]);
        let join = left.join(right, JoinType::LeftOuter, None);
        let nullable: Vec<bool> = join.output().iter().map(|a| a.nullable).collect();
        assert_eq!(nullable, vec![false, true, true]);
    }

    #[test]
    fn full_outer_forces_both_sides_nullable() {
        let join = relation(&[("a", false)]).join(relation(&[("b", false)]), JoinType::FullOuter, None);
        assert!(join.output().iter().all(|a| a.nullable));
    }

    #[test]
    fn right_outer_forces_left_nullable() {
        let join = relation(&[("a", false)]).join(relation(&[("b", false)]), JoinType::RightOuter, None);
        let nullable: Vec<bool> = join.output().iter().map(|a| a.nullable).collect();
        assert_eq!(nullable, vec![true, false]);
    }

    #[test]
    fn semi_and_anti_output_left_only() {
        for join_type in [JoinType::LeftSemi, JoinType::LeftAnti] {
            let left = relation(&[("a", true)]);
            let join = left.clone().join(relation(&[("b", true)]), join_type, None);
            assert_eq!(join.output(), left.output());
        }
    }

    #[test]
    fn existence_join_appends_marker() {
        let left = relation(&[("a", true), ("b", true)]);
        let marker = Attribute::not_null("exists", DataType::Boolean);
        let join = left.clone().join(relation(&[("c", true)]), JoinType::ExistenceJoin(marker.clone()), None);
        assert_eq!(join.output().len(), 3);
        assert_eq!(&join.output()[..2], left.output());
        assert_eq!(join.output()[2].expr_id, marker.expr_id);
    }

    #[test]
    fn intersect_nullable_only_if_both_sides_are() {
        let left = relation(&[("a", true), ("b", true)]);
        let right = relation(&[("c", false), ("d", true)]);
        let plan = left.clone().intersect(right, false);
        let nullable: Vec<bool> = plan.output().iter().map(|a| a.nullable).collect();
        assert_eq!(nullable, vec![false, true]);
        assert_eq!(plan.output()[0].expr_id, left.output()[0].expr_id);
    }

    #[test]
    fn except_outputs_left() {
        let left = relation(&[("a", true)]);
        let plan = left.clone().except(relation(&[("b", false)]), false);
        assert_eq!(plan.output(), left.output());
    }

    #[test]
    fn subquery_alias_qualifies_with_path() {
        let child = relation(&[("a", true)]);
        let identifier = AliasIdentifier::qualified("t", vec!["cat".into(), "db".into()]);
        let plan = LogicalPlan::unary(UnaryOperator::SubqueryAlias(SubqueryAliasNode { identifier }), child);
        assert_eq!(plan.output()[0].qualifier, vec!["cat".to_owned(), "db".to_owned(), "t".to_owned()]);
    }

    #[test]
    fn window_produces_only_window_columns() {
        let r = relation(&[("a", true)]);
        let rank = Expr::function("rank", vec![], DataType::Integer).over(vec![], vec![col(&r, 0).asc()]).alias("rk");
        let rank_attr = rank.to_attribute().unwrap();
        let plan = r.clone().window(vec![rank], vec![], vec![col(&r, 0).asc()]);
        assert_eq!(plan.output().len(), 2);
        let produced = plan.produced_attributes();
        assert_eq!(produced.len(), 1);
        assert!(produced.contains(&rank_attr));
    }

    #[test]
    fn pivot_names_columns_by_value() {
        let r = relation(&[("k", true), ("p", true), ("v", true)]);
        let sum = Expr::aggregate("sum", vec![col(&r, 2)], DataType::Long);
        let single = PivotNode::new(Some(vec![col(&r, 0)]), col(&r, 1), vec![Expr::lit(1i64)], vec![sum.clone()]);
        let names: Vec<&str> = single.pivot_output.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["1"]);

        let count = Expr::aggregate("count", vec![col(&r, 2)], DataType::Long);
        let double = PivotNode::new(None, col(&r, 1), vec![Expr::lit(1i64)], vec![sum, count]);
        assert_eq!(double.pivot_output.len(), 2);
        assert!(double.pivot_output[0].name.starts_with("1_"));

        let plan = LogicalPlan::unary(UnaryOperator::Pivot(Box::new(single)), r);
        assert_eq!(plan.output().len(), 2);
    }
}

// ============================================================================
// Row bounds
// ============================================================================

mod bounds {
    use super::*;

    fn huge() -> LogicalPlan {
        LogicalPlan::range(i64::MIN, i64::MAX, 1).unwrap()
    }

    fn unbounded() -> LogicalPlan {
        rows(10).local_limit(3)
    }

    #[test]
    fn intersect_is_min_when_defined() {
        assert_eq!(rows(3).intersect(rows(8), true).max_rows(), Some(3));
        assert_eq!(rows(3).intersect(unbounded(), true).max_rows(), None);
    }

    #[test]
    fn except_ignores_right() {
        assert_eq!(rows(3).except(unbounded(), false).max_rows(), Some(3));
        assert_eq!(unbounded().except(rows(3), false).max_rows(), None);
    }

    #[test]
    fn union_sums() {
        assert_eq!(rows(3).union_all(rows(4)).max_rows(), Some(7));
        assert_eq!(rows(3).union_all(unbounded()).max_rows(), None);
    }

    #[test]
    fn inner_join_product() {
        assert_eq!(rows(3).join(rows(4), JoinType::Inner, None).max_rows(), Some(12));
        assert_eq!(huge().join(rows(2), JoinType::Inner, None).max_rows(), None);
    }

    #[test]
    fn literal_limits_only() {
        assert_eq!(rows(100).limit(5).max_rows(), Some(5));
        assert_eq!(rows(100).local_limit(5).max_rows_per_partition(), Some(5));

        let n = Attribute::new("n", DataType::Integer);
        let symbolic = LimitNode { limit_expr: Expr::attr(&n) };
        let global = LogicalPlan::unary(UnaryOperator::GlobalLimit(symbolic.clone()), rows(100));
        let local = LogicalPlan::unary(UnaryOperator::LocalLimit(symbolic), rows(100));
        assert_eq!(global.max_rows(), None);
        assert_eq!(local.max_rows_per_partition(), None);
    }

    #[test]
    fn one_row_relation() {
        let plan = LogicalPlan::one_row_relation();
        assert_eq!(plan.max_rows(), Some(1));
        assert!(plan.output().is_empty());
    }

    #[test]
    fn tail_and_offset() {
        assert_eq!(rows(10).tail(4).max_rows(), Some(4));
        assert_eq!(rows(10).offset(4).max_rows(), Some(6));
    }
}

// ============================================================================
// Resolution
// ============================================================================

mod resolution {
    use super::*;

    #[test]
    fn project_of_plain_columns_is_resolved() {
        let r = relation(&[("a", true), ("b", true)]);
        let plan = r.clone().project(vec![col(&r, 0), col(&r, 1).add(Expr::lit(1i64)).alias("b1")]);
        assert!(plan.resolved());
    }

    #[test]
    fn project_rejects_aggregates_generators_and_windows() {
        let r = relation(&[("a", true)]);
        let agg = Expr::aggregate("sum", vec![col(&r, 0)], DataType::Long).alias("s");
        assert!(!r.clone().project(vec![agg.clone()]).resolved());

        let window = Expr::function("rank", vec![], DataType::Integer).over(vec![], vec![]).alias("rk");
        assert!(!r.clone().project(vec![window]).resolved());

        let generator = Expr::generator("explode", vec![col(&r, 0)], vec![]).alias("g");
        assert!(!r.clone().project(vec![generator]).resolved());

        // the same aggregate is fine under Aggregate
        assert!(r.aggregate(vec![], vec![agg]).resolved());
    }

    #[test]
    fn unresolved_reference_blocks_resolution() {
        let r = relation(&[("a", true)]);
        let plan = r.project(vec![Expr::unresolved("x")]);
        assert!(!plan.resolved());
        assert!(plan.children_resolved());
    }

    #[test]
    fn unresolved_child_blocks_parent() {
        let plan = LogicalPlan::unresolved_relation(vec!["t".into()]).distinct();
        assert!(!plan.resolved());
        assert!(!plan.children_resolved());
    }

    #[test]
    fn pivot_is_never_resolved() {
        let r = relation(&[("k", true), ("p", true)]);
        let sum = Expr::aggregate("sum", vec![col(&r, 0)], DataType::Long);
        let pivot = PivotNode::new(None, col(&r, 1), vec![Expr::lit(1i64)], vec![sum]);
        let plan = LogicalPlan::unary(UnaryOperator::Pivot(Box::new(pivot)), r);
        assert!(plan.children_resolved());
        assert!(!plan.resolved());
    }

    #[test]
    fn natural_and_using_joins_wait_for_rewrite() {
        let natural = JoinType::NaturalJoin(Box::new(JoinType::Inner));
        let using = JoinType::UsingJoin(Box::new(JoinType::Inner), vec!["a".into()]);
        for join_type in [natural, using] {
            let plan = relation(&[("a", true)]).join(relation(&[("a", true)]), join_type, None);
            assert!(!plan.resolved());
            assert!(plan.contains_pattern(TreePattern::NaturalLikeJoin));
        }
    }

    #[test]
    fn join_needs_boolean_condition_and_distinct_sides() {
        let l = relation(&[("a", true)]);
        let r = relation(&[("b", true)]);
        let ok = l.clone().join(r.clone(), JoinType::Inner, Some(col(&l, 0).eq(col(&r, 0))));
        assert!(ok.resolved());
        let not_boolean = l.clone().join(r, JoinType::Inner, Some(col(&l, 0)));
        assert!(!not_boolean.resolved());
        let self_join = l.clone().join(l, JoinType::Cross, None);
        assert!(!self_join.resolved());
    }

    #[test]
    fn union_needs_two_children_of_equal_arity() {
        assert!(!LogicalPlan::union(vec![relation(&[("a", true)])]).unwrap().resolved());
        assert!(relation(&[("a", true)]).union_all(relation(&[("b", false)])).resolved());
        let mismatched = relation(&[("a", true)]).union_all(relation(&[("b", true), ("c", true)]));
        assert!(!mismatched.resolved());
    }
}

// ============================================================================
// Grouping sets, ranges, partitioning
// ============================================================================

mod encoders {
    use super::*;

    #[test]
    fn bitmask_of_a_and_c_is_five() {
        let attrs: Vec<Attribute> = ["a", "b", "c", "d"].iter().map(|n| Attribute::new(*n, DataType::Long)).collect();
        let set = vec![attrs[0].clone(), attrs[2].clone()];
        assert_eq!(build_bitmask(&attrs, &set, 32).unwrap(), 0b0101);
        assert_eq!(build_bitmask(&attrs, &[], 32).unwrap(), 0b1111);
        assert_eq!(build_bitmask(&attrs, &attrs, 32).unwrap(), 0);
    }

    #[test]
    fn bitmask_rejects_too_many_attributes() {
        let attrs: Vec<Attribute> = (0..9).map(|i| Attribute::new(format!("c{i}"), DataType::Long)).collect();
        let err = build_bitmask(&attrs, &[], 8).unwrap_err();
        assert_eq!(err, PlanError::TooManyGroupingAttributes { count: 9, max: 8 });
    }

    #[test]
    fn range_element_counts() {
        let count = |start, end, step| RangeNode::new(start, end, step, None).unwrap().num_elements();
        assert_eq!(count(0, 4, 2), 2);
        assert_eq!(count(0, 2, 1), 2);
        assert_eq!(count(5, 0, -1), 5);
        assert_eq!(count(0, 5, 2), 3);
        assert_eq!(count(0, 5, -1), -5);
        assert_eq!(RangeNode::new(0, 5, -1, None).unwrap().max_rows(), Some(0));
    }

    #[test]
    fn range_rejects_zero_step() {
        assert_eq!(LogicalPlan::range(0, 10, 0).unwrap_err(), PlanError::ZeroStep);
    }

    #[test]
    fn partitioning_by_expression_kind() {
        let config = SessionConfig::default();
        let a = Attribute::new("a", DataType::Long);
        let partitioning = |exprs: Vec<Expr>, n: Option<i64>| {
            RepartitionByExpressionNode::new(exprs, n, &config).unwrap().partitioning()
        };

        assert!(matches!(partitioning(vec![Expr::attr(&a).asc()], Some(4)), Partitioning::Range(_, 4)));
        assert!(matches!(partitioning(vec![Expr::attr(&a)], Some(4)), Partitioning::Hash(_, 4)));
        assert_eq!(partitioning(vec![], Some(4)), Partitioning::RoundRobin(4));
        assert_eq!(partitioning(vec![Expr::attr(&a)], Some(1)), Partitioning::Single);
        assert_eq!(partitioning(vec![], Some(1)), Partitioning::Single);
        assert_eq!(partitioning(vec![], None).num_partitions(), config.num_shuffle_partitions);
    }

    #[test]
    fn partitioning_rejects_mixed_expressions() {
        let a = Attribute::new("a", DataType::Long);
        let mixed = vec![Expr::attr(&a).asc(), Expr::attr(&a)];
        let err = RepartitionByExpressionNode::new(mixed, Some(2), &SessionConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::MixedPartitionExpressions(_)));
    }
}

// ============================================================================
// Rewriting and canonical comparison
// ============================================================================

mod rewriting {
    use super::*;

    #[test]
    fn with_new_children_keeps_tags() {
        let r = relation(&[("a", true)]);
        let mut plan = r.clone().filter(col(&r, 0).is_not_null());
        plan.set_tag("pass", "pushdown");

        let replaced = plan.with_new_children(vec![relation(&[("a", true)])]).unwrap();
        assert_eq!(replaced.tag("pass"), Some("pushdown"));
        assert_eq!(replaced.node_name(), "Filter");
    }

    #[test]
    fn with_new_children_rejects_wrong_arity() {
        let plan = relation(&[("a", true)]).distinct();
        let err = plan.with_new_children(vec![]).unwrap_err();
        assert_eq!(err, PlanError::ChildCountMismatch { operator: "Distinct", expected: 1, actual: 0 });

        let join = relation(&[("a", true)]).join(relation(&[("b", true)]), JoinType::Cross, None);
        assert!(join.with_new_children(vec![relation(&[("c", true)])]).is_err());
    }

    #[test]
    fn node_patterns_describe_shape() {
        let join = relation(&[("a", true)]).join(relation(&[("b", true)]), JoinType::LeftOuter, None);
        assert!(join.node_patterns().contains(TreePattern::Join));
        assert!(join.node_patterns().contains(TreePattern::OuterJoin));
        assert!(!join.node_patterns().contains(TreePattern::InnerLikeJoin));

        let plan = join.distinct().limit(1);
        assert!(plan.contains_pattern(TreePattern::OuterJoin));
        assert!(plan.contains_pattern(TreePattern::DistinctLike));
        assert!(!plan.node_patterns().contains(TreePattern::Join));
    }

    fn grouped_query() -> LogicalPlan {
        let l = relation(&[("k", true), ("v", true)]);
        let r = relation(&[("k2", true)]);
        let sum = Expr::aggregate("sum", vec![col(&l, 1)], DataType::Long).alias("total");
        l.clone()
            .join(r.clone(), JoinType::Inner, Some(col(&l, 0).eq(col(&r, 0))))
            .aggregate(vec![col(&l, 0)], vec![col(&l, 0), sum])
            .sort(vec![Expr::unresolved("total").desc()], true)
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let once = grouped_query().canonicalized();
        assert_eq!(once.canonicalized(), once);
    }

    #[test]
    fn independently_built_queries_match() {
        assert!(grouped_query().same_result(&grouped_query()));
        assert!(!grouped_query().same_result(&grouped_query().limit(1)));
    }
}
