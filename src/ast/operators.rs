use std::fmt;

/// Comparison operators of a WHERE or HAVING condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Equal (`=`)
    Equals,
    /// Not equal (`!=`)
    NotEquals,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
    /// `LIKE /regex/`
    Like,
    /// `NOT LIKE /regex/` (also written `IS NOT LIKE`)
    NotLike,
}

impl ComparisonOp {
    pub fn is_null_check(self) -> bool {
        matches!(self, ComparisonOp::IsNull | ComparisonOp::IsNotNull)
    }

    pub fn is_pattern(self) -> bool {
        matches!(self, ComparisonOp::Like | ComparisonOp::NotLike)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOp::Equals => "=",
            ComparisonOp::NotEquals => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::LessEqual => "<=",
            ComparisonOp::GreaterEqual => ">=",
            ComparisonOp::IsNull => "IS NULL",
            ComparisonOp::IsNotNull => "IS NOT NULL",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
        };
        f.write_str(s)
    }
}

/// Logical connectives joining WHERE conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `AND`, binds tighter than `OR`
    And,
    /// `OR`
    Or,
}

/// Aggregate functions usable in SELECT and HAVING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// Sort direction of an ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}
