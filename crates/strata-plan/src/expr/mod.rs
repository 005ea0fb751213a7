//! Plan expressions.
//!
//! Plan nodes treat expressions as opaque values except for a handful of
//! capabilities: identity, type, nullability, resolution, the set of
//! referenced attributes and whether certain expression kinds (aggregates,
//! generators, window functions, correlated subqueries) occur inside them.

// Allow arithmetic method names that match std traits - these build new
// expressions rather than implementing the operators
#![allow(clippy::should_implement_trait)]
// Allow the long Display impl - it's a big match but simple
#![allow(clippy::too_many_lines)]
// Allow missing_const_for_fn - const fn with Vec isn't stable
#![allow(clippy::missing_const_for_fn)]

mod attribute;
mod canonical;
mod set;

use std::fmt;

use strata_core::{DataType, ExprId, StructField, Value};

pub use attribute::{Attribute, AttributeMap, AttributeSet};
pub use set::ExpressionSet;

use crate::plan::{LogicalPlan, TreePattern, TreePatternBits};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Remainder.
    Mod,
    /// Equality (`=`).
    Eq,
    /// Null-safe equality (`<=>`).
    EqNullSafe,
    /// Inequality.
    NotEq,
    /// Less than.
    Lt,
    /// Less than or equal.
    LtEq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    GtEq,
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

impl BinaryOp {
    /// Returns true for arithmetic operators.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    /// Returns true for comparison operators.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::EqNullSafe | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Returns true for AND / OR.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// The operator with its operands swapped, if it has one.
    #[must_use]
    pub const fn flipped(self) -> Option<Self> {
        match self {
            Self::Eq | Self::EqNullSafe | Self::NotEq | Self::Add | Self::Mul | Self::And | Self::Or => {
                Some(self)
            }
            Self::Lt => Some(Self::Gt),
            Self::LtEq => Some(Self::GtEq),
            Self::Gt => Some(Self::Lt),
            Self::GtEq => Some(Self::LtEq),
            Self::Sub | Self::Div | Self::Mod => None,
        }
    }

    /// Returns true if a NULL operand always yields NULL.
    #[must_use]
    pub const fn is_null_intolerant(self) -> bool {
        !matches!(self, Self::And | Self::Or | Self::EqNullSafe)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::EqNullSafe => "<=>",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        };
        write!(f, "{s}")
    }
}

/// An expression inside a logical plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant.
    Literal {
        /// The value.
        value: Value,
        /// The declared type of the value.
        data_type: DataType,
    },

    /// A resolved column reference.
    Attribute(Attribute),

    /// A column reference that has not been bound yet.
    Unresolved {
        /// Dotted name parts, e.g. `["t", "a"]`.
        name_parts: Vec<String>,
    },

    /// A named expression introducing a new column slot.
    Alias {
        /// The aliased expression.
        child: Box<Expr>,
        /// The output name.
        name: String,
        /// Identity of the new column slot.
        expr_id: ExprId,
        /// Qualifier of the new column.
        qualifier: Vec<String>,
    },

    /// A type conversion.
    Cast {
        /// The converted expression.
        child: Box<Expr>,
        /// Target type.
        data_type: DataType,
        /// Whether ANSI cast rules apply.
        ansi: bool,
    },

    /// A binary operation.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// Logical negation.
    Not(Box<Expr>),

    /// `expr IS NULL`.
    IsNull(Box<Expr>),

    /// `expr IS NOT NULL`.
    IsNotNull(Box<Expr>),

    /// A scalar function call.
    Function {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Result type.
        data_type: DataType,
        /// Whether the same input always yields the same output.
        deterministic: bool,
    },

    /// An aggregate function call.
    Aggregate {
        /// Function name.
        func: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Whether DISTINCT was specified.
        distinct: bool,
        /// Result type.
        data_type: DataType,
    },

    /// A table-generating function such as `explode`.
    Generator {
        /// Function name.
        func: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Columns of each generated row.
        element_schema: Vec<StructField>,
    },

    /// A window function application.
    Window {
        /// The windowed function.
        function: Box<Expr>,
        /// PARTITION BY expressions.
        partition_by: Vec<Expr>,
        /// ORDER BY expressions (sort orders).
        order_by: Vec<Expr>,
    },

    /// A sort key with direction.
    SortOrder {
        /// The sort key.
        child: Box<Expr>,
        /// Ascending or descending.
        ascending: bool,
        /// Whether NULLs sort first.
        nulls_first: bool,
    },

    /// A reference to a column of an enclosing query.
    OuterReference(Attribute),

    /// A scalar subquery.
    Subquery {
        /// The subquery plan.
        plan: Box<LogicalPlan>,
        /// Outer-query expressions the subquery is correlated on.
        outer_refs: Vec<Expr>,
    },
}

impl Expr {
    // ========== Constructors ==========

    /// Creates a literal with the value's natural type.
    #[must_use]
    pub fn lit(value: impl Into<Value>) -> Self {
        let value = value.into();
        let data_type = value.natural_type();
        Self::Literal { value, data_type }
    }

    /// Creates a literal with an explicit type.
    #[must_use]
    pub fn typed_lit(value: impl Into<Value>, data_type: DataType) -> Self {
        Self::Literal { value: value.into(), data_type }
    }

    /// Creates a typed NULL literal.
    #[must_use]
    pub fn null(data_type: DataType) -> Self {
        Self::Literal { value: Value::Null, data_type }
    }

    /// Creates a reference to a resolved attribute.
    #[must_use]
    pub fn attr(attribute: &Attribute) -> Self {
        Self::Attribute(attribute.clone())
    }

    /// Creates an unresolved column reference from a dotted name.
    #[must_use]
    pub fn unresolved(name: &str) -> Self {
        Self::Unresolved { name_parts: name.split('.').map(str::to_owned).collect() }
    }

    /// Wraps this expression in an alias with a fresh identity.
    #[must_use]
    pub fn alias(self, name: impl Into<String>) -> Self {
        Self::Alias { child: Box::new(self), name: name.into(), expr_id: ExprId::next(), qualifier: Vec::new() }
    }

    /// Casts this expression.
    #[must_use]
    pub fn cast(self, data_type: DataType) -> Self {
        Self::Cast { child: Box::new(self), data_type, ansi: false }
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(self, op: BinaryOp, other: Self) -> Self {
        Self::Binary { left: Box::new(self), op, right: Box::new(other) }
    }

    /// `self AND other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// `self OR other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// `self = other`.
    #[must_use]
    pub fn eq(self, other: Self) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// `self <=> other`.
    #[must_use]
    pub fn eq_null_safe(self, other: Self) -> Self {
        self.binary(BinaryOp::EqNullSafe, other)
    }

    /// `self != other`.
    #[must_use]
    pub fn not_eq(self, other: Self) -> Self {
        self.binary(BinaryOp::NotEq, other)
    }

    /// `self < other`.
    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    /// `self <= other`.
    #[must_use]
    pub fn lt_eq(self, other: Self) -> Self {
        self.binary(BinaryOp::LtEq, other)
    }

    /// `self > other`.
    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    /// `self >= other`.
    #[must_use]
    pub fn gt_eq(self, other: Self) -> Self {
        self.binary(BinaryOp::GtEq, other)
    }

    /// `self + other`.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    /// `self - other`.
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        self.binary(BinaryOp::Sub, other)
    }

    /// `self * other`.
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        self.binary(BinaryOp::Mul, other)
    }

    /// `NOT self`.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `self IS NULL`.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull(Box::new(self))
    }

    /// `self IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNotNull(Box::new(self))
    }

    /// Ascending sort order, nulls first.
    #[must_use]
    pub fn asc(self) -> Self {
        Self::SortOrder { child: Box::new(self), ascending: true, nulls_first: true }
    }

    /// Descending sort order, nulls last.
    #[must_use]
    pub fn desc(self) -> Self {
        Self::SortOrder { child: Box::new(self), ascending: false, nulls_first: false }
    }

    /// Creates a deterministic scalar function call.
    #[must_use]
    pub fn function(name: impl Into<String>, args: Vec<Self>, data_type: DataType) -> Self {
        Self::Function { name: name.into(), args, data_type, deterministic: true }
    }

    /// Creates a non-deterministic scalar function call such as `rand()`.
    #[must_use]
    pub fn nondeterministic(name: impl Into<String>, args: Vec<Self>, data_type: DataType) -> Self {
        Self::Function { name: name.into(), args, data_type, deterministic: false }
    }

    /// Creates an aggregate function call.
    #[must_use]
    pub fn aggregate(func: impl Into<String>, args: Vec<Self>, data_type: DataType) -> Self {
        Self::Aggregate { func: func.into(), args, distinct: false, data_type }
    }

    /// Creates a generator call.
    #[must_use]
    pub fn generator(func: impl Into<String>, args: Vec<Self>, element_schema: Vec<StructField>) -> Self {
        Self::Generator { func: func.into(), args, element_schema }
    }

    /// Applies a window to this function.
    #[must_use]
    pub fn over(self, partition_by: Vec<Self>, order_by: Vec<Self>) -> Self {
        Self::Window { function: Box::new(self), partition_by, order_by }
    }

    /// Creates an outer reference.
    #[must_use]
    pub fn outer(attribute: &Attribute) -> Self {
        Self::OuterReference(attribute.clone())
    }

    /// Creates a scalar subquery correlated on `outer_refs`.
    #[must_use]
    pub fn scalar_subquery(plan: LogicalPlan, outer_refs: Vec<Self>) -> Self {
        Self::Subquery { plan: Box::new(plan), outer_refs }
    }

    // ========== Capabilities ==========

    /// The result type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Literal { data_type, .. } | Self::Cast { data_type, .. } => data_type.clone(),
            Self::Function { data_type, .. } | Self::Aggregate { data_type, .. } => data_type.clone(),
            Self::Attribute(a) | Self::OuterReference(a) => a.data_type.clone(),
            Self::Unresolved { .. } => DataType::Null,
            Self::Alias { child, .. } | Self::SortOrder { child, .. } => child.data_type(),
            Self::Window { function, .. } => function.data_type(),
            Self::Binary { left, op, right } => {
                if op.is_arithmetic() {
                    if *op == BinaryOp::Div {
                        DataType::Double
                    } else {
                        wider_numeric(&left.data_type(), &right.data_type())
                    }
                } else {
                    DataType::Boolean
                }
            }
            Self::Not(_) | Self::IsNull(_) | Self::IsNotNull(_) => DataType::Boolean,
            Self::Generator { element_schema, .. } => DataType::Struct(element_schema.clone()),
            Self::Subquery { plan, .. } => {
                plan.output().first().map_or(DataType::Null, |a| a.data_type.clone())
            }
        }
    }

    /// Whether the result may be NULL.
    #[must_use]
    pub fn nullable(&self) -> bool {
        match self {
            Self::Literal { value, .. } => value.is_null(),
            Self::Attribute(a) | Self::OuterReference(a) => a.nullable,
            Self::Unresolved { .. } | Self::Function { .. } | Self::Subquery { .. } => true,
            Self::Alias { child, .. } | Self::SortOrder { child, .. } | Self::Not(child) => child.nullable(),
            Self::Cast { child, data_type, ansi } => {
                child.nullable()
                    || (!*ansi && matches!(child.data_type(), DataType::String) && data_type.is_numeric())
            }
            Self::Binary { left, op, right } => match op {
                BinaryOp::EqNullSafe => false,
                BinaryOp::Div | BinaryOp::Mod => true,
                _ => left.nullable() || right.nullable(),
            },
            Self::IsNull(_) | Self::IsNotNull(_) | Self::Generator { .. } => false,
            Self::Aggregate { func, .. } => !func.eq_ignore_ascii_case("count"),
            Self::Window { function, .. } => function.nullable(),
        }
    }

    /// Whether this expression is fully analyzed.
    #[must_use]
    pub fn resolved(&self) -> bool {
        match self {
            Self::Literal { .. } | Self::Attribute(_) | Self::OuterReference(_) => true,
            Self::Unresolved { .. } => false,
            Self::Alias { child, .. } | Self::Cast { child, .. } | Self::SortOrder { child, .. } => {
                child.resolved()
            }
            Self::IsNull(child) | Self::IsNotNull(child) => child.resolved(),
            Self::Not(child) => child.resolved() && child.data_type() == DataType::Boolean,
            Self::Binary { left, op, right } => {
                left.resolved() && right.resolved() && binary_input_types_ok(*op, left, right)
            }
            Self::Function { args, .. } | Self::Aggregate { args, .. } | Self::Generator { args, .. } => {
                args.iter().all(Self::resolved)
            }
            Self::Window { function, partition_by, order_by } => {
                function.resolved()
                    && partition_by.iter().all(Self::resolved)
                    && order_by.iter().all(Self::resolved)
            }
            Self::Subquery { plan, outer_refs } => plan.resolved() && outer_refs.iter().all(Self::resolved),
        }
    }

    /// Whether evaluation is a pure function of the input row.
    #[must_use]
    pub fn deterministic(&self) -> bool {
        match self {
            Self::Function { deterministic: false, .. } => false,
            _ => self.children().into_iter().all(Self::deterministic),
        }
    }

    /// Whether the expression can be evaluated without an input row.
    #[must_use]
    pub fn foldable(&self) -> bool {
        match self {
            Self::Literal { .. } => true,
            Self::Alias { child, .. }
            | Self::Cast { child, .. }
            | Self::Not(child)
            | Self::IsNull(child)
            | Self::IsNotNull(child) => child.foldable(),
            Self::Binary { left, right, .. } => left.foldable() && right.foldable(),
            _ => false,
        }
    }

    /// Whether a NULL input always produces a NULL result.
    #[must_use]
    pub fn null_intolerant(&self) -> bool {
        match self {
            Self::Binary { op, .. } => op.is_null_intolerant(),
            Self::Not(_) | Self::Cast { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this is a sort order.
    #[must_use]
    pub fn is_sort_order(&self) -> bool {
        matches!(self, Self::SortOrder { .. })
    }

    /// The column this expression names, if it names one.
    #[must_use]
    pub fn to_attribute(&self) -> Option<Attribute> {
        match self {
            Self::Attribute(a) => Some(a.clone()),
            Self::Alias { child, name, expr_id, qualifier } => Some(Attribute {
                name: name.clone(),
                data_type: child.data_type(),
                nullable: child.nullable(),
                expr_id: *expr_id,
                qualifier: qualifier.clone(),
                metadata: Default::default(),
            }),
            _ => None,
        }
    }

    /// The element schema if this is a generator.
    #[must_use]
    pub fn element_schema(&self) -> Option<&[StructField]> {
        match self {
            Self::Generator { element_schema, .. } => Some(element_schema.as_slice()),
            _ => None,
        }
    }

    /// Attributes of the enclosing plan's input that this expression reads.
    ///
    /// Outer references belong to an enclosing query and are not included.
    #[must_use]
    pub fn references(&self) -> AttributeSet {
        let mut refs = AttributeSet::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut AttributeSet) {
        match self {
            Self::Attribute(a) => {
                refs.insert(a.clone());
            }
            Self::OuterReference(_) => {}
            _ => {
                for child in self.children() {
                    child.collect_references(refs);
                }
            }
        }
    }

    /// Direct sub-expressions.
    #[must_use]
    pub fn children(&self) -> Vec<&Self> {
        match self {
            Self::Literal { .. } | Self::Attribute(_) | Self::Unresolved { .. } | Self::OuterReference(_) => {
                Vec::new()
            }
            Self::Alias { child, .. }
            | Self::Cast { child, .. }
            | Self::SortOrder { child, .. }
            | Self::Not(child)
            | Self::IsNull(child)
            | Self::IsNotNull(child) => vec![child.as_ref()],
            Self::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::Function { args, .. } | Self::Aggregate { args, .. } | Self::Generator { args, .. } => {
                args.iter().collect()
            }
            Self::Window { function, partition_by, order_by } => std::iter::once(function.as_ref())
                .chain(partition_by.iter())
                .chain(order_by.iter())
                .collect(),
            Self::Subquery { outer_refs, .. } => outer_refs.iter().collect(),
        }
    }

    /// Rebuilds this expression with `f` applied to each direct child.
    #[must_use]
    pub fn map_children(self, f: &mut dyn FnMut(Self) -> Self) -> Self {
        let mut boxed = |e: Box<Self>| Box::new(f(*e));
        match self {
            leaf @ (Self::Literal { .. } | Self::Attribute(_) | Self::Unresolved { .. } | Self::OuterReference(_)) => {
                leaf
            }
            Self::Alias { child, name, expr_id, qualifier } => {
                Self::Alias { child: boxed(child), name, expr_id, qualifier }
            }
            Self::Cast { child, data_type, ansi } => Self::Cast { child: boxed(child), data_type, ansi },
            Self::SortOrder { child, ascending, nulls_first } => {
                Self::SortOrder { child: boxed(child), ascending, nulls_first }
            }
            Self::Not(child) => Self::Not(boxed(child)),
            Self::IsNull(child) => Self::IsNull(boxed(child)),
            Self::IsNotNull(child) => Self::IsNotNull(boxed(child)),
            Self::Binary { left, op, right } => {
                let left = boxed(left);
                Self::Binary { left, op, right: boxed(right) }
            }
            Self::Function { name, args, data_type, deterministic } => {
                Self::Function { name, args: args.into_iter().map(&mut *f).collect(), data_type, deterministic }
            }
            Self::Aggregate { func, args, distinct, data_type } => {
                Self::Aggregate { func, args: args.into_iter().map(&mut *f).collect(), distinct, data_type }
            }
            Self::Generator { func, args, element_schema } => {
                Self::Generator { func, args: args.into_iter().map(&mut *f).collect(), element_schema }
            }
            Self::Window { function, partition_by, order_by } => {
                let function = boxed(function);
                Self::Window {
                    function,
                    partition_by: partition_by.into_iter().map(&mut *f).collect(),
                    order_by: order_by.into_iter().map(&mut *f).collect(),
                }
            }
            Self::Subquery { plan, outer_refs } => {
                Self::Subquery { plan, outer_refs: outer_refs.into_iter().map(&mut *f).collect() }
            }
        }
    }

    /// Applies `rule` to every node, children before parents.
    #[must_use]
    pub fn transform_up(self, rule: &mut dyn FnMut(Self) -> Self) -> Self {
        let rebuilt = self.map_children(&mut |child| child.transform_up(&mut *rule));
        rule(rebuilt)
    }

    /// Applies `rule` to every node, parents before children.
    #[must_use]
    pub fn transform_down(self, rule: &mut dyn FnMut(Self) -> Self) -> Self {
        rule(self).map_children(&mut |child| child.transform_down(&mut *rule))
    }

    /// Replaces every sub-expression semantically equal to `target`.
    #[must_use]
    pub fn replace_semantic(&self, target: &Self, replacement: &Self) -> Self {
        let target = target.canonicalize();
        self.clone().transform_down(&mut |e| {
            if e.canonicalize() == target {
                replacement.clone()
            } else {
                e
            }
        })
    }

    /// Returns true if `pred` holds for this expression or any descendant.
    pub fn exists(&self, pred: &dyn Fn(&Self) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.exists(pred))
    }

    /// Returns true if an aggregate call occurs anywhere in this expression.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        self.exists(&|e| matches!(e, Self::Aggregate { .. }))
    }

    /// Returns true if a generator occurs anywhere in this expression.
    #[must_use]
    pub fn contains_generator(&self) -> bool {
        self.exists(&|e| matches!(e, Self::Generator { .. }))
    }

    /// Returns true if a window expression occurs anywhere in this expression.
    #[must_use]
    pub fn contains_window(&self) -> bool {
        self.exists(&|e| matches!(e, Self::Window { .. }))
    }

    /// Returns true if this expression depends on an enclosing query.
    #[must_use]
    pub fn has_correlated_subquery(&self) -> bool {
        self.exists(&|e| match e {
            Self::Subquery { outer_refs, .. } => !outer_refs.is_empty(),
            Self::OuterReference(_) => true,
            _ => false,
        })
    }

    /// Splits a conjunction into its conjuncts.
    #[must_use]
    pub fn split_conjunction(&self) -> Vec<&Self> {
        match self {
            Self::Binary { left, op: BinaryOp::And, right } => {
                let mut out = left.split_conjunction();
                out.extend(right.split_conjunction());
                out
            }
            other => vec![other],
        }
    }

    /// Evaluates a constant expression.
    ///
    /// Returns `None` if the expression is not foldable or a cast fails.
    #[must_use]
    pub fn eval(&self) -> Option<Value> {
        match self {
            Self::Literal { value, .. } => Some(value.clone()),
            Self::Alias { child, .. } => child.eval(),
            Self::Cast { child, data_type, .. } => cast_value(child.eval()?, data_type),
            _ => None,
        }
    }

    /// Tree patterns of this expression and all its descendants.
    #[must_use]
    pub fn patterns(&self) -> TreePatternBits {
        let mut bits = TreePatternBits::empty();
        self.collect_patterns(&mut bits);
        bits
    }

    fn collect_patterns(&self, bits: &mut TreePatternBits) {
        match self {
            Self::Literal { .. } => bits.insert(TreePattern::Literal),
            Self::Alias { .. } => bits.insert(TreePattern::Alias),
            Self::Cast { .. } => bits.insert(TreePattern::Cast),
            Self::Aggregate { .. } => bits.insert(TreePattern::AggregateExpression),
            Self::Window { .. } => bits.insert(TreePattern::WindowExpression),
            Self::Generator { .. } => bits.insert(TreePattern::Generator),
            Self::OuterReference(_) => bits.insert(TreePattern::OuterReference),
            Self::Subquery { .. } => bits.insert(TreePattern::SubqueryExpression),
            _ => {}
        }
        for child in self.children() {
            child.collect_patterns(bits);
        }
    }

    /// A SQL rendering without expression ids.
    #[must_use]
    pub fn sql(&self) -> String {
        let list = |exprs: &[Self]| exprs.iter().map(Self::sql).collect::<Vec<_>>().join(", ");
        match self {
            Self::Literal { value, .. } => value.sql(),
            Self::Attribute(a) | Self::OuterReference(a) => a.name.clone(),
            Self::Unresolved { name_parts } => name_parts.join("."),
            Self::Alias { child, name, .. } => format!("{} AS {name}", child.sql()),
            Self::Cast { child, data_type, .. } => format!("CAST({} AS {data_type})", child.sql()),
            Self::Binary { left, op, right } => format!("({} {op} {})", left.sql(), right.sql()),
            Self::Not(child) => format!("(NOT {})", child.sql()),
            Self::IsNull(child) => format!("({} IS NULL)", child.sql()),
            Self::IsNotNull(child) => format!("({} IS NOT NULL)", child.sql()),
            Self::Function { name, args, .. } => format!("{name}({})", list(args)),
            Self::Aggregate { func, args, distinct, .. } => {
                format!("{func}({}{})", if *distinct { "DISTINCT " } else { "" }, list(args))
            }
            Self::Generator { func, args, .. } => format!("{func}({})", list(args)),
            Self::Window { function, .. } => format!("{} OVER (...)", function.sql()),
            Self::SortOrder { child, ascending, .. } => {
                format!("{} {}", child.sql(), if *ascending { "ASC" } else { "DESC" })
            }
            Self::Subquery { .. } => "(scalar subquery)".to_owned(),
        }
    }
}

fn numeric_rank(data_type: &DataType) -> Option<u8> {
    match data_type {
        DataType::Byte => Some(1),
        DataType::Short => Some(2),
        DataType::Integer => Some(3),
        DataType::Long => Some(4),
        DataType::Decimal { .. } => Some(5),
        DataType::Float => Some(6),
        DataType::Double => Some(7),
        _ => None,
    }
}

fn wider_numeric(left: &DataType, right: &DataType) -> DataType {
    match (numeric_rank(left), numeric_rank(right)) {
        (Some(l), Some(r)) if r > l => right.clone(),
        (None, Some(_)) => right.clone(),
        _ => left.clone(),
    }
}

fn binary_input_types_ok(op: BinaryOp, left: &Expr, right: &Expr) -> bool {
    let (l, r) = (left.data_type(), right.data_type());
    let null_or = |t: &DataType, pred: &dyn Fn(&DataType) -> bool| matches!(t, DataType::Null) || pred(t);
    if op.is_logical() {
        null_or(&l, &|t| *t == DataType::Boolean) && null_or(&r, &|t| *t == DataType::Boolean)
    } else if op.is_arithmetic() {
        null_or(&l, &DataType::is_numeric) && null_or(&r, &DataType::is_numeric)
    } else {
        matches!(l, DataType::Null)
            || matches!(r, DataType::Null)
            || (l.is_numeric() && r.is_numeric())
            || l.same_type(&r)
    }
}

fn cast_value(value: Value, target: &DataType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }
    match target {
        DataType::Byte | DataType::Short | DataType::Integer | DataType::Long => {
            let v = value.to_i64().ok()?;
            let fits = match target {
                DataType::Byte => i8::try_from(v).is_ok(),
                DataType::Short => i16::try_from(v).is_ok(),
                DataType::Integer => i32::try_from(v).is_ok(),
                _ => true,
            };
            fits.then_some(Value::Int(v))
        }
        DataType::Float | DataType::Double => match value {
            Value::Int(v) => Some(Value::Float(v as f64)),
            Value::Float(v) => Some(Value::Float(v)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Float),
            _ => None,
        },
        DataType::String => Some(Value::String(value.to_string())),
        DataType::Boolean => match value {
            Value::Bool(b) => Some(Value::Bool(b)),
            Value::Int(v) => Some(Value::Bool(v != 0)),
            _ => None,
        },
        _ => None,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
            for (i, e) in exprs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{e}")?;
            }
            Ok(())
        }

        match self {
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::Attribute(a) => write!(f, "{a}"),
            Self::Unresolved { name_parts } => write!(f, "'{}", name_parts.join(".")),
            Self::Alias { child, name, expr_id, .. } => write!(f, "{child} AS {name}{expr_id}"),
            Self::Cast { child, data_type, .. } => write!(f, "CAST({child} AS {data_type})"),
            Self::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Self::Not(child) => write!(f, "NOT {child}"),
            Self::IsNull(child) => write!(f, "isnull({child})"),
            Self::IsNotNull(child) => write!(f, "isnotnull({child})"),
            Self::Function { name, args, .. } => {
                write!(f, "{name}(")?;
                list(f, args)?;
                write!(f, ")")
            }
            Self::Aggregate { func, args, distinct, .. } => {
                write!(f, "{func}(")?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                list(f, args)?;
                write!(f, ")")
            }
            Self::Generator { func, args, .. } => {
                write!(f, "{func}(")?;
                list(f, args)?;
                write!(f, ")")
            }
            Self::Window { function, partition_by, order_by } => {
                write!(f, "{function} OVER (")?;
                if !partition_by.is_empty() {
                    write!(f, "PARTITION BY ")?;
                    list(f, partition_by)?;
                }
                if !order_by.is_empty() {
                    if !partition_by.is_empty() {
                        write!(f, " ")?;
                    }
                    write!(f, "ORDER BY ")?;
                    list(f, order_by)?;
                }
                write!(f, ")")
            }
            Self::SortOrder { child, ascending, nulls_first } => write!(
                f,
                "{child} {} NULLS {}",
                if *ascending { "ASC" } else { "DESC" },
                if *nulls_first { "FIRST" } else { "LAST" }
            ),
            Self::OuterReference(a) => write!(f, "outer({a})"),
            Self::Subquery { outer_refs, .. } => {
                write!(f, "scalar-subquery [")?;
                list(f, outer_refs)?;
                write!(f, "]")
            }
        }
    }
}
