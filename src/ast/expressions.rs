use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::ast::{ComparisonOp, FieldPath, LogicalOp};

/// A WHERE or HAVING expression tree.
///
/// Each node is exclusively owned by its parent; the root by the `Query`.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereExpr {
    /// A single comparison
    ///
    /// # Example
    /// ```text
    /// employee.salary > 50000
    /// ```
    Condition(Condition),

    /// Two sub-expressions joined by `AND` or `OR`
    Logical {
        op: LogicalOp,
        left: Box<WhereExpr>,
        right: Box<WhereExpr>,
    },
}

impl WhereExpr {
    pub fn and(left: WhereExpr, right: WhereExpr) -> Self {
        WhereExpr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: WhereExpr, right: WhereExpr) -> Self {
        WhereExpr::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// All conditions, left to right.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            WhereExpr::Condition(c) => out.push(c),
            WhereExpr::Logical { left, right, .. } => {
                left.collect_conditions(out);
                right.collect_conditions(out);
            }
        }
    }

    /// Rebuilds the tree with every condition field passed through `f`.
    pub fn map_fields(&self, f: &mut impl FnMut(&FieldPath) -> FieldPath) -> WhereExpr {
        match self {
            WhereExpr::Condition(c) => WhereExpr::Condition(Condition::new(
                f(&c.field),
                c.op,
                c.value.clone(),
                c.is_numeric,
            )),
            WhereExpr::Logical { op, left, right } => WhereExpr::Logical {
                op: *op,
                left: Box::new(left.map_fields(f)),
                right: Box::new(right.map_fields(f)),
            },
        }
    }

    pub(crate) fn fields_mut(&mut self, f: &mut impl FnMut(&mut FieldPath)) {
        match self {
            WhereExpr::Condition(c) => f(&mut c.field),
            WhereExpr::Logical { left, right, .. } => {
                left.fields_mut(f);
                right.fields_mut(f);
            }
        }
    }
}

/// A comparison of one field against a literal or pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: FieldPath,
    pub op: ComparisonOp,
    /// Literal to compare against, or the regex source for LIKE
    pub value: String,
    /// The literal was written as a bare number
    pub is_numeric: bool,
    regex: RegexCache,
}

impl Condition {
    pub fn new(
        field: FieldPath,
        op: ComparisonOp,
        value: impl Into<String>,
        is_numeric: bool,
    ) -> Self {
        Condition {
            field,
            op,
            value: value.into(),
            is_numeric,
            regex: RegexCache::default(),
        }
    }

    /// The compiled LIKE pattern, or `None` when it does not compile.
    pub fn regex(&self) -> Option<&Regex> {
        self.regex
            .0
            .get_or_init(|| Regex::new(&self.value).ok())
            .as_ref()
    }
}

/// Compiled once on first use and shared by every document the condition
/// is evaluated against.
#[derive(Default)]
struct RegexCache(OnceLock<Option<Regex>>);

impl Clone for RegexCache {
    fn clone(&self) -> Self {
        RegexCache::default()
    }
}

impl PartialEq for RegexCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RegexCache")
    }
}
