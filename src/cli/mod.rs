//! CLI support for ariane-xml
//!
//! The pieces of the `ariane-xml` binary that do not depend on argument
//! parsing, so they can be driven from other tools and from tests.

mod convert;
mod run;

pub use convert::{OutputFormat, rows_to_json, rows_to_tsv, templates_to_text};
pub use run::{RunOptions, RunResult, notices, run_query};

use std::io;

use thiserror::Error;

/// Errors surfaced by the command line
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("{0}")]
    Execute(#[from] crate::ExecuteError),

    #[error("Schema error: {0}")]
    Schema(#[from] crate::SchemaError),

    #[error("{0}")]
    Template(#[from] crate::TemplateError),

    #[error("Cannot format output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No query provided. Pass it as an argument or pipe it to stdin.")]
    NoQuery,
}
