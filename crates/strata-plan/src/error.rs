//! Plan construction errors.
//!
//! Every variant here is a precondition violation raised while building a
//! node. A node that is merely not yet analyzed is not an error; see
//! [`LogicalPlan::resolved`](crate::plan::LogicalPlan::resolved).

use strata_core::CoreError;
use thiserror::Error;

/// Errors that can occur while constructing or rewriting a plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// A range was given a step of zero.
    #[error("range step must not be zero")]
    ZeroStep,

    /// A sample fraction outside the permitted interval.
    #[error("sampling fraction ({fraction}) must be {}", sample_requirement(.with_replacement))]
    InvalidSampleFraction {
        /// The requested fraction (`upper - lower`).
        fraction: f64,
        /// Whether sampling is with replacement.
        with_replacement: bool,
    },

    /// A repartition was asked for zero or fewer partitions.
    #[error("number of partitions ({0}) must be positive")]
    NonPositivePartitions(i64),

    /// Two attribute lists that must line up have different lengths.
    #[error("attribute count mismatch in {operation}: expected {expected}, found {actual}")]
    AttributeCountMismatch {
        /// The operation doing the rewrite.
        operation: &'static str,
        /// Length of the reference list.
        expected: usize,
        /// Length of the rewritten list.
        actual: usize,
    },

    /// More grouping attributes than the grouping id has bits.
    #[error("too many grouping attributes: {count} exceeds the {max}-bit grouping id")]
    TooManyGroupingAttributes {
        /// Number of grouping attributes.
        count: usize,
        /// Bit width of the grouping id.
        max: usize,
    },

    /// A grouping set named an attribute that is not a grouping attribute.
    #[error("grouping set refers to {0}, which is not a grouping attribute")]
    UnknownGroupingAttribute(String),

    /// A rewrite supplied the wrong number of children.
    #[error("{operator} expects {expected} children, got {actual}")]
    ChildCountMismatch {
        /// The operator being rebuilt.
        operator: &'static str,
        /// Arity of the operator.
        expected: usize,
        /// Number of children supplied.
        actual: usize,
    },

    /// Sort-order and plain partition expressions were mixed.
    #[error(
        "RepartitionByExpression expects that either all its partition expressions are sort \
         orders (range partitioning) or none of them are (hash partitioning); got: {0}"
    )]
    MixedPartitionExpressions(String),

    /// A Generate node was given something that is not a generator.
    #[error("{0} is not a generator")]
    InvalidGenerator(String),

    /// A union needs at least one child.
    #[error("union requires at least one child")]
    EmptyUnion,

    /// A range bound could not be coerced to the expected type.
    #[error("incompatible input data type for {expr}. Expected: {expected}; Found: {found}")]
    IncompatibleRangeInput {
        /// The offending expression.
        expr: String,
        /// The type the parameter must coerce to.
        expected: String,
        /// The expression's actual type.
        found: String,
    },

    /// Error from the core type layer.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

fn sample_requirement(with_replacement: &bool) -> &'static str {
    if *with_replacement {
        "nonnegative with replacement"
    } else {
        "on interval [0, 1] without replacement"
    }
}

/// Result type for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_fraction_messages() {
        let with = PlanError::InvalidSampleFraction { fraction: -0.5, with_replacement: true };
        assert_eq!(with.to_string(), "sampling fraction (-0.5) must be nonnegative with replacement");

        let without = PlanError::InvalidSampleFraction { fraction: 1.5, with_replacement: false };
        assert!(without.to_string().contains("[0, 1]"));
    }

    #[test]
    fn core_errors_convert() {
        let err: PlanError = CoreError::InvalidLiteral("x".into()).into();
        assert!(matches!(err, PlanError::Core(_)));
    }
}
