//! Parse, rewrite and execute one query

use std::path::PathBuf;

use tracing::info;

use super::CliError;
use crate::{
    DsnSchema, Executor, ExecutorConfig, Lexer, Parser, ResultRow, ShortcutRewriter,
    ShortcutWarning,
    executor::{AmbiguousField, ExecutionStats, Progress},
};

/// Options for a single run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// The query text
    pub query: String,
    /// DSN schema (JSON) used to expand short codes
    pub schema: Option<PathBuf>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Also report ambiguous SELECT fields
    pub diagnose: bool,
    pub executor: ExecutorConfig,
}

/// Result of a run
#[derive(Debug)]
pub enum RunResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Query executed
    Rows {
        rows: Vec<ResultRow>,
        stats: ExecutionStats,
        /// Short codes resolved by falling back to the first candidate
        warnings: Vec<ShortcutWarning>,
        ambiguous: Vec<AmbiguousField>,
    },
}

pub fn run_query(options: &RunOptions, progress: Progress<'_>) -> Result<RunResult, CliError> {
    let mut parser = Parser::new(Lexer::new(&options.query));
    let query = parser.parse_query()?;

    if options.syntax_only {
        return Ok(RunResult::SyntaxValid);
    }

    let (query, warnings) = match &options.schema {
        Some(path) => {
            let schema = DsnSchema::load(path)?;
            info!("Loaded DSN schema {} from {}", schema.version(), path.display());
            let rewritten = ShortcutRewriter::new(&schema).rewrite(&query);
            (rewritten.query, rewritten.warnings)
        }
        None => (query, Vec::new()),
    };

    let executor = Executor::new(options.executor.clone());
    let ambiguous = if options.diagnose {
        executor.ambiguous_fields(&query)?
    } else {
        Vec::new()
    };
    let (rows, stats) = executor.execute_with_progress(&query, progress)?;

    Ok(RunResult::Rows {
        rows,
        stats,
        warnings,
        ambiguous,
    })
}

/// Warnings for stderr that are not already logged: ambiguous SELECT
/// fields and skipped files. Shortcut fallbacks are logged by the rewriter.
pub fn notices(result: &RunResult) -> Vec<String> {
    let RunResult::Rows { stats, ambiguous, .. } = result else {
        return Vec::new();
    };

    let mut out: Vec<String> = ambiguous
        .iter()
        .map(|field| {
            format!(
                "'{}' matches {} different element paths; results may mix them",
                field.field, field.paths
            )
        })
        .collect();
    if stats.failed_files > 0 {
        out.push(format!(
            "{} of {} file(s) could not be processed",
            stats.failed_files, stats.total_files
        ));
    }
    out
}
