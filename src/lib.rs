pub mod ast;
pub mod cli;
pub mod document;
pub mod executor;
pub mod lexer;
pub mod navigator;
pub mod parser;
pub mod result;
pub mod rewriter;
pub mod schema;
pub mod templates;

pub use ast::{FieldPath, Query, Token, TokenKind, WhereExpr};
pub use document::{DocumentProvider, FileSystem, LoadError};
pub use executor::{ExecuteError, ExecutionStats, Executor, ExecutorConfig};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, parse_query};
pub use result::ResultRow;
pub use rewriter::{Rewritten, ShortcutRewriter, ShortcutWarning};
pub use schema::{DsnAttribute, DsnBloc, DsnSchema, SchemaError, SchemaProvider};
pub use templates::{QueryTemplate, TemplateError};
