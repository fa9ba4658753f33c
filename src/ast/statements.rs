use crate::ast::{FieldPath, SortDirection};

/// `FOR variable IN path [AT position]`
///
/// Binds `variable` to each element matched by `path`. Later clauses may
/// start their path with an earlier clause's variable, which nests the
/// iteration.
///
/// # Example
/// ```text
/// FOR d IN department FOR e IN d.employee AT i
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ForClause {
    pub variable: String,
    pub path: FieldPath,
    /// 1-based position variable introduced with `AT`
    pub position_var: Option<String>,
}

impl ForClause {
    pub fn has_position(&self) -> bool {
        self.position_var.is_some()
    }
}

/// One key of an ORDER BY list.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByField {
    /// Result column name, e.g. `name`, `@id` or `COUNT(*)`
    pub field: String,
    pub direction: SortDirection,
}
