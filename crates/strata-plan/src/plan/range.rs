//! The `Range` leaf.
//!
//! `Range(start, end, step)` produces the single `id: BIGINT` column with
//! values `start, start + step, ...` up to but excluding `end`. Unlike every
//! other operator it owns enough information to compute exact statistics.

use strata_core::{DataType, SessionConfig, Value};

use crate::error::{PlanError, PlanResult};
use crate::expr::{Attribute, Expr};

/// Column statistics of the `id` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnStat {
    /// Number of distinct values.
    pub distinct_count: u128,
    /// Smallest value, if it fits in a `BIGINT`.
    pub min: Option<i64>,
    /// Largest value, if it fits in a `BIGINT`.
    pub max: Option<i64>,
    /// Number of NULLs.
    pub null_count: u128,
    /// Average value width in bytes.
    pub avg_len: u64,
    /// Largest value width in bytes.
    pub max_len: u64,
}

/// Statistics of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    /// Estimated output size.
    pub size_in_bytes: u128,
    /// Exact row count.
    pub row_count: u128,
    /// Statistics of the `id` column; absent for an empty range.
    pub id_stat: Option<ColumnStat>,
}

/// A numeric range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeNode {
    /// First value.
    pub start: i64,
    /// Exclusive bound.
    pub end: i64,
    /// Increment; never zero.
    pub step: i64,
    /// Requested number of partitions.
    pub num_slices: Option<u32>,
    /// The `id` column.
    pub output: Attribute,
}

impl RangeNode {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::ZeroStep`] if `step` is zero.
    pub fn new(start: i64, end: i64, step: i64, num_slices: Option<u32>) -> PlanResult<Self> {
        if step == 0 {
            return Err(PlanError::ZeroStep);
        }
        Ok(Self { start, end, step, num_slices, output: Attribute::not_null("id", DataType::Long) })
    }

    /// Creates a range from bound expressions.
    ///
    /// Each bound is implicitly cast to `BIGINT` (the slice count to `INT`)
    /// under the session's cast rules and then evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::IncompatibleRangeInput`] if an expression cannot
    /// be cast or does not evaluate to a non-null value, and the errors of
    /// [`RangeNode::new`].
    pub fn from_exprs(
        start: &Expr,
        end: &Expr,
        step: &Expr,
        num_slices: Option<&Expr>,
        config: &SessionConfig,
    ) -> PlanResult<Self> {
        let ansi = config.ansi_enabled;
        let start = cast_and_eval(start, &DataType::Long, ansi)?;
        let end = cast_and_eval(end, &DataType::Long, ansi)?;
        let step = cast_and_eval(step, &DataType::Long, ansi)?;
        let num_slices = match num_slices {
            Some(expr) => {
                let n = cast_and_eval(expr, &DataType::Integer, ansi)?;
                Some(u32::try_from(n).ok().filter(|n| *n > 0).ok_or(PlanError::NonPositivePartitions(n))?)
            }
            None => None,
        };
        Self::new(start, end, step, num_slices)
    }

    /// Number of values the range produces.
    ///
    /// Negative when the step points away from `end`; bounds and statistics
    /// clamp it at zero.
    #[must_use]
    pub fn num_elements(&self) -> i128 {
        let start = i128::from(self.start);
        let end = i128::from(self.end);
        let step = i128::from(self.step);
        let span = end - start;
        let quotient = span / step;
        if span % step == 0 || (span > 0) != (step > 0) {
            quotient
        } else {
            quotient + 1
        }
    }

    /// Number of values, clamped at zero.
    #[must_use]
    pub fn row_count(&self) -> u128 {
        u128::try_from(self.num_elements()).unwrap_or(0)
    }

    /// Upper bound on rows, if it fits.
    #[must_use]
    pub fn max_rows(&self) -> Option<u64> {
        u64::try_from(self.row_count()).ok()
    }

    /// Upper bound on rows in one slice.
    #[must_use]
    pub fn max_rows_per_partition(&self) -> Option<u64> {
        match self.num_slices {
            Some(slices) => u64::try_from(self.row_count().div_ceil(u128::from(slices))).ok(),
            None => self.max_rows(),
        }
    }

    /// The order rows come out in.
    #[must_use]
    pub fn output_ordering(&self) -> Vec<Expr> {
        let id = Expr::attr(&self.output);
        if self.step > 0 {
            vec![id.asc()]
        } else {
            vec![id.desc()]
        }
    }

    /// Exact statistics of the range.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let rows = self.row_count();
        if rows == 0 {
            return Statistics { size_in_bytes: 0, row_count: 0, id_stat: None };
        }
        let width = DataType::Long.default_size();
        let last = i128::from(self.start) + (self.num_elements() - 1) * i128::from(self.step);
        let (min, max) =
            if self.step > 0 { (i128::from(self.start), last) } else { (last, i128::from(self.start)) };
        Statistics {
            size_in_bytes: rows * width as u128,
            row_count: rows,
            id_stat: Some(ColumnStat {
                distinct_count: rows,
                min: i64::try_from(min).ok(),
                max: i64::try_from(max).ok(),
                null_count: 0,
                avg_len: width as u64,
                max_len: width as u64,
            }),
        }
    }
}

fn cast_and_eval(expr: &Expr, target: &DataType, ansi: bool) -> PlanResult<i64> {
    let incompatible = || PlanError::IncompatibleRangeInput {
        expr: expr.sql(),
        expected: target.to_string(),
        found: expr.data_type().to_string(),
    };
    if !expr.data_type().can_implicit_cast(target, ansi) {
        return Err(incompatible());
    }
    let cast = Expr::Cast { child: Box::new(expr.clone()), data_type: target.clone(), ansi };
    match cast.eval() {
        Some(Value::Int(v)) => Ok(v),
        _ => Err(incompatible()),
    }
}
