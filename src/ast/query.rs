use crate::ast::{FieldPath, ForClause, OrderByField, WhereExpr};

/// A complete parsed query.
///
/// Built once by the parser and optionally rewritten into a new `Query`;
/// never mutated while it executes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Fields to select, in output order
    pub select_fields: Vec<FieldPath>,

    /// `SELECT DISTINCT`
    pub distinct: bool,

    /// File or directory to query
    pub from_path: String,

    /// FOR clauses, outermost first
    pub for_clauses: Vec<ForClause>,

    pub where_clause: Option<WhereExpr>,

    /// GROUP BY names, in key order
    pub group_by_fields: Vec<String>,

    /// Filter applied after aggregation
    pub having: Option<WhereExpr>,

    pub order_by_fields: Vec<OrderByField>,

    pub limit: Option<usize>,

    pub offset: Option<usize>,

    /// At least one SELECT field is an aggregate
    pub has_aggregates: bool,
}

impl Query {
    pub fn is_for_variable(&self, name: &str) -> bool {
        self.for_clauses.iter().any(|fc| fc.variable == name)
    }

    pub fn is_position_variable(&self, name: &str) -> bool {
        self.for_clauses
            .iter()
            .any(|fc| fc.position_var.as_deref() == Some(name))
    }

    /// The FOR clause declaring `name` as its iteration variable.
    pub fn for_clause(&self, name: &str) -> Option<&ForClause> {
        self.for_clauses.iter().find(|fc| fc.variable == name)
    }

    /// Marks `field` as a variable reference when its first component names a
    /// FOR or AT variable of this query.
    pub fn bind_variables(&self, field: &mut FieldPath) {
        if let Some(first) = field.components.first()
            && (self.is_for_variable(first) || self.is_position_variable(first))
        {
            field.variable = Some(first.clone());
        }
    }

    /// A GROUP BY or ORDER BY name as a field path, variables bound.
    pub fn field_from_name(&self, name: &str) -> FieldPath {
        let mut field = FieldPath::from_name(name);
        self.bind_variables(&mut field);
        field
    }

    /// Aggregation or grouping is needed to produce the result.
    pub fn needs_aggregation(&self) -> bool {
        self.has_aggregates || !self.group_by_fields.is_empty()
    }
}
