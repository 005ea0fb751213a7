//! Relational plan nodes.
//!
//! This module defines the parameters of the standard relational operators.
//! The children of an operator live in [`PlanKind`](super::PlanKind), not
//! here.

// Allow missing_const_for_fn - const fn with Vec isn't stable
#![allow(clippy::missing_const_for_fn)]

use strata_core::{DataType, Value};

use crate::error::{PlanError, PlanResult};
use crate::expr::{Attribute, Expr};

/// Rounding tolerance of the random sampler, applied to sample bounds.
pub const SAMPLE_ROUNDING_EPSILON: f64 = 1e-6;

/// Inline rows with a declared schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRelationNode {
    /// Column attributes.
    pub output: Vec<Attribute>,
    /// Row values, one inner vector per row.
    pub rows: Vec<Vec<Value>>,
}

impl LocalRelationNode {
    /// Creates a relation with the given rows.
    #[must_use]
    pub fn new(output: Vec<Attribute>, rows: Vec<Vec<Value>>) -> Self {
        Self { output, rows }
    }

    /// Creates a relation with no rows.
    #[must_use]
    pub fn empty(output: Vec<Attribute>) -> Self {
        Self { output, rows: Vec::new() }
    }
}

/// A reference to a CTE definition elsewhere in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CteRelationRefNode {
    /// Id of the referenced definition.
    pub cte_id: u64,
    /// Whether the referenced definition was resolved when this reference was made.
    pub resolved: bool,
    /// Columns of the referenced relation.
    pub output: Vec<Attribute>,
}

/// A relation name that has not been looked up yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRelationNode {
    /// Name parts, e.g. `["db", "table"]`.
    pub multipart_identifier: Vec<String>,
}

/// A projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    /// Projected expressions, each an attribute or an alias.
    pub project_list: Vec<Expr>,
}

impl ProjectNode {
    /// Creates a new projection node.
    #[must_use]
    pub fn new(project_list: Vec<Expr>) -> Self {
        Self { project_list }
    }
}

/// A filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    /// The predicate to filter by.
    pub condition: Expr,
}

impl FilterNode {
    /// Creates a new filter node.
    #[must_use]
    pub const fn new(condition: Expr) -> Self {
        Self { condition }
    }
}

/// Applies a generator to every input row.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateNode {
    /// The generator expression.
    pub generator: Expr,
    /// Positions of child columns left out of the output.
    pub unrequired_child_index: Vec<usize>,
    /// Emit a row of NULLs when the generator produces nothing.
    pub outer: bool,
    /// Qualifier applied to the generated columns.
    pub qualifier: Option<String>,
    /// Columns the generator produces.
    pub generator_output: Vec<Attribute>,
}

impl GenerateNode {
    /// Creates a generate node.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidGenerator`] if `generator` is not a
    /// generator call.
    pub fn new(
        generator: Expr,
        unrequired_child_index: Vec<usize>,
        outer: bool,
        qualifier: Option<String>,
        generator_output: Vec<Attribute>,
    ) -> PlanResult<Self> {
        if !matches!(generator, Expr::Generator { .. }) {
            return Err(PlanError::InvalidGenerator(generator.to_string()));
        }
        Ok(Self { generator, unrequired_child_index, outer, qualifier, generator_output })
    }

    /// Fresh output attributes for a generator, one per element field.
    #[must_use]
    pub fn output_for(generator: &Expr) -> Vec<Attribute> {
        generator.element_schema().map_or_else(Vec::new, |schema| {
            schema.iter().map(|f| Attribute::new(f.name.clone(), f.data_type.clone()).with_nullability(f.nullable)).collect()
        })
    }

    /// Generated columns with the qualifier applied and, for outer
    /// generation, nullability forced on.
    #[must_use]
    pub fn qualified_generator_output(&self) -> Vec<Attribute> {
        self.generator_output
            .iter()
            .map(|a| {
                let a = match &self.qualifier {
                    Some(q) => a.clone().with_qualifier(vec![q.clone()]),
                    None => a.clone(),
                };
                if self.outer {
                    a.with_nullability(true)
                } else {
                    a
                }
            })
            .collect()
    }
}

/// A sort.
#[derive(Debug, Clone, PartialEq)]
pub struct SortNode {
    /// Sort orders.
    pub order: Vec<Expr>,
    /// Whether the sort is total (true) or within partitions (false).
    pub global: bool,
}

/// A limit, local limit or tail.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitNode {
    /// Number of rows to keep.
    pub limit_expr: Expr,
}

impl LimitNode {
    /// Creates a limit with a literal row count.
    #[must_use]
    pub fn new(limit: i64) -> Self {
        Self { limit_expr: Expr::typed_lit(limit, DataType::Integer) }
    }

    /// The limit when it is a non-negative integer literal.
    #[must_use]
    pub fn literal_limit(&self) -> Option<u64> {
        integer_literal(&self.limit_expr)
    }
}

/// An offset.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetNode {
    /// Number of rows to skip.
    pub offset_expr: Expr,
}

impl OffsetNode {
    /// Creates an offset with a literal row count.
    #[must_use]
    pub fn new(offset: i64) -> Self {
        Self { offset_expr: Expr::typed_lit(offset, DataType::Integer) }
    }

    /// The offset when it is a non-negative integer literal.
    #[must_use]
    pub fn literal_offset(&self) -> Option<u64> {
        integer_literal(&self.offset_expr)
    }
}

/// The value of a non-negative integral literal.
pub(crate) fn integer_literal(expr: &Expr) -> Option<u64> {
    match expr {
        Expr::Literal { value: Value::Int(n), data_type } if data_type.is_integral() => u64::try_from(*n).ok(),
        _ => None,
    }
}

/// Marks the root of a subquery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubqueryNode {
    /// Whether the subquery references an enclosing query.
    pub correlated: bool,
}

/// The name a subquery alias gives its relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasIdentifier {
    /// The alias.
    pub name: String,
    /// Qualifier in front of the alias, e.g. a catalog and database.
    pub qualifier: Vec<String>,
}

impl AliasIdentifier {
    /// An unqualified alias.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), qualifier: Vec::new() }
    }

    /// An alias with a qualifier.
    #[must_use]
    pub fn qualified(name: impl Into<String>, qualifier: Vec<String>) -> Self {
        Self { name: name.into(), qualifier }
    }

    /// The qualifier path given to output attributes: `qualifier ++ [name]`.
    #[must_use]
    pub fn qualifier_path(&self) -> Vec<String> {
        let mut path = self.qualifier.clone();
        path.push(self.name.clone());
        path
    }
}

/// Renames the relation of its child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubqueryAliasNode {
    /// The alias.
    pub identifier: AliasIdentifier,
}

/// A grouped aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateNode {
    /// GROUP BY expressions.
    pub grouping_expressions: Vec<Expr>,
    /// Output expressions, each an attribute or an alias.
    pub aggregate_expressions: Vec<Expr>,
}

impl AggregateNode {
    /// Creates a new aggregate node.
    #[must_use]
    pub fn new(grouping_expressions: Vec<Expr>, aggregate_expressions: Vec<Expr>) -> Self {
        Self { grouping_expressions, aggregate_expressions }
    }
}

/// Window function evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowNode {
    /// Aliased window expressions.
    pub window_expressions: Vec<Expr>,
    /// PARTITION BY expressions.
    pub partition_spec: Vec<Expr>,
    /// ORDER BY sort orders.
    pub order_spec: Vec<Expr>,
}

/// A pivot awaiting rewrite into an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotNode {
    /// Explicit grouping, if any.
    pub group_by: Option<Vec<Expr>>,
    /// The pivoted column.
    pub pivot_column: Expr,
    /// Values that become columns.
    pub pivot_values: Vec<Expr>,
    /// Aggregates computed per pivot value.
    pub aggregates: Vec<Expr>,
    /// One column per (value, aggregate) pair.
    pub pivot_output: Vec<Attribute>,
}

impl PivotNode {
    /// Creates a pivot, allocating one output column per value and aggregate.
    ///
    /// Columns are named after the value alone when there is a single
    /// aggregate, otherwise `<value>_<aggregate sql>`.
    #[must_use]
    pub fn new(group_by: Option<Vec<Expr>>, pivot_column: Expr, pivot_values: Vec<Expr>, aggregates: Vec<Expr>) -> Self {
        let single = aggregates.len() == 1;
        let pivot_output = pivot_values
            .iter()
            .flat_map(|value| {
                aggregates.iter().map(move |agg| {
                    let name = if single { value.to_string() } else { format!("{value}_{}", agg.sql()) };
                    Attribute::new(name, agg.data_type())
                })
            })
            .collect();
        Self { group_by, pivot_column, pivot_values, aggregates, pivot_output }
    }
}

/// Removes duplicate rows by a set of key columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DeduplicateNode {
    /// Key columns.
    pub keys: Vec<Attribute>,
}

/// A random sample of the child's rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleNode {
    /// Lower bound of the acceptance range.
    pub lower_bound: f64,
    /// Upper bound of the acceptance range.
    pub upper_bound: f64,
    /// Whether rows may be picked more than once.
    pub with_replacement: bool,
    /// Random seed.
    pub seed: u64,
}

impl SampleNode {
    /// Creates a sample node.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidSampleFraction`] if `upper - lower` is
    /// negative, or above one without replacement, beyond the sampler's
    /// rounding tolerance.
    pub fn new(lower_bound: f64, upper_bound: f64, with_replacement: bool, seed: u64) -> PlanResult<Self> {
        let fraction = upper_bound - lower_bound;
        let eps = SAMPLE_ROUNDING_EPSILON;
        let ok = if with_replacement {
            fraction >= -eps
        } else {
            fraction >= -eps && fraction <= 1.0 + eps
        };
        if !ok {
            return Err(PlanError::InvalidSampleFraction { fraction, with_replacement });
        }
        Ok(Self { lower_bound, upper_bound, with_replacement, seed })
    }

    /// The sampled fraction.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

/// The producer side of a CTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CteRelationDefNode {
    /// Id references use to find this definition.
    pub id: u64,
}

/// Collects named metrics as rows flow through.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectMetricsNode {
    /// Name of the metric group.
    pub name: String,
    /// Metric expressions.
    pub metrics: Vec<Expr>,
}

/// Writes the child to a directory. Replaced by a concrete sink before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertIntoDirNode {
    /// Write to the local file system.
    pub is_local: bool,
    /// Target path.
    pub path: String,
    /// Replace existing content.
    pub overwrite: bool,
}

/// An execution hint resolved from query text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintInfo {
    /// Requested join strategy, e.g. `broadcast`.
    pub strategy: Option<String>,
}

impl HintInfo {
    /// A hint requesting a join strategy.
    #[must_use]
    pub fn strategy(strategy: impl Into<String>) -> Self {
        Self { strategy: Some(strategy.into()) }
    }
}

/// Parameters of INTERSECT and EXCEPT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOperationNode {
    /// Keep duplicates (`ALL`).
    pub is_all: bool,
}

/// Parameters of a union.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnionNode {
    /// Match columns by name instead of position.
    pub by_name: bool,
    /// With `by_name`, fill columns missing on one side with NULL.
    pub allow_missing_col: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strata_core::StructField;

    use super::*;

    #[test]
    fn sample_bounds() {
        assert!(SampleNode::new(0.0, 0.5, false, 7).is_ok());
        assert!(SampleNode::new(0.0, 1.0 + 1e-7, false, 7).is_ok());
        assert!(SampleNode::new(0.0, 3.0, true, 7).is_ok());
        assert_eq!(
            SampleNode::new(0.0, 1.5, false, 7).unwrap_err(),
            PlanError::InvalidSampleFraction { fraction: 1.5, with_replacement: false }
        );
        assert!(SampleNode::new(0.5, 0.0, true, 7).is_err());
    }

    #[test]
    fn literal_limits() {
        assert_eq!(LimitNode::new(5).literal_limit(), Some(5));
        assert_eq!(LimitNode::new(-1).literal_limit(), None);
        let a = Attribute::new("n", DataType::Integer);
        assert_eq!(LimitNode { limit_expr: Expr::attr(&a) }.literal_limit(), None);
        assert_eq!(LimitNode { limit_expr: Expr::lit("5") }.literal_limit(), None);
    }

    #[test]
    fn pivot_output_names() {
        let v = Attribute::new("v", DataType::Long);
        let sum = Expr::aggregate("sum", vec![Expr::attr(&v)], DataType::Long);
        let count = Expr::aggregate("count", vec![Expr::lit(1i64)], DataType::Long);
        let col = Expr::attr(&Attribute::new("year", DataType::Integer));

        let single = PivotNode::new(None, col.clone(), vec![Expr::lit(2020i64), Expr::lit(2021i64)], vec![sum.clone()]);
        let names: Vec<_> = single.pivot_output.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["2020", "2021"]);

        let multi = PivotNode::new(None, col, vec![Expr::lit(2020i64)], vec![sum, count]);
        let names: Vec<_> = multi.pivot_output.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["2020_sum(v)", "2020_count(1)"]);
    }

    #[test]
    fn generate_requires_generator() {
        let a = Attribute::new("a", DataType::Long);
        let err = GenerateNode::new(Expr::attr(&a), vec![], false, None, vec![]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidGenerator(_)));
    }

    #[test]
    fn outer_generation_forces_nullable() {
        let arr = Attribute::new("xs", DataType::array(DataType::Long, false));
        let gen = Expr::generator("explode", vec![Expr::attr(&arr)], vec![StructField::new("col", DataType::Long).with_nullable(false)]);
        let out = GenerateNode::output_for(&gen);
        assert!(!out[0].nullable);
        let node = GenerateNode::new(gen, vec![], true, Some("g".into()), out).unwrap();
        let qualified = node.qualified_generator_output();
        assert!(qualified[0].nullable);
        assert_eq!(qualified[0].qualifier, ["g"]);
    }

    #[test]
    fn alias_qualifier_path() {
        let id = AliasIdentifier::qualified("t", vec!["cat".into(), "db".into()]);
        assert_eq!(id.qualifier_path(), ["cat", "db", "t"]);
        assert_eq!(AliasIdentifier::new("t").qualifier_path(), ["t"]);
    }
}
