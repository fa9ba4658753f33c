//! # Query AST
//!
//! The data model shared by the parser, the shortcut rewriter and the executor.
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[field]** - Field paths (`dept.employee.name`, `@id`, `FILE_NAME`, aggregates)
//! - **[expressions]** - WHERE / HAVING expression trees
//! - **[operators]** - Comparison and logical operators, aggregates, sort direction
//! - **[statements]** - FOR and ORDER BY clauses
//! - **[query]** - The complete query
//!
//! ## Quick Start
//!
//! ```text
//! SELECT name, salary FROM ./data WHERE salary > 50000 ORDER BY salary DESC
//! ```
//!
//! ## Path Semantics
//!
//! A single-component field (`name`) is searched anywhere in the document. A
//! multi-component field (`employee.name`) matches any element whose ancestor
//! chain ends with those components. There is no anchoring at the root.
//!
//! ## Iteration
//!
//! ```text
//! SELECT d.name, e.name FROM ./data FOR d IN department FOR e IN d.employee AT i
//! ```
//!
//! FOR clauses bind a variable to each matched element, nested in declaration
//! order; `AT` binds the 1-based position.
pub mod expressions;
pub mod field;
pub mod operators;
pub mod query;
pub mod statements;
pub mod tokens;

pub use expressions::{Condition, WhereExpr};
pub use field::{FILE_NAME, FieldPath};
pub use operators::{Aggregate, ComparisonOp, LogicalOp, SortDirection};
pub use query::Query;
pub use statements::{ForClause, OrderByField};
pub use tokens::{Token, TokenKind};
