//! Query execution over a file or a directory of documents.
//!
//! Each file is loaded and searched independently, possibly on a worker
//! thread; the per-file rows are merged and then aggregated, filtered,
//! sorted and paginated as a whole.

mod aggregate;
mod bindings;
mod extract;
mod postprocess;
mod scheduler;

use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    ast::Query,
    document::{DocumentProvider, FileSystem, LoadError, display_name, parse_document},
    navigator::count_matching_paths,
    result::ResultRow,
};

use extract::Column;

/// Knobs for [`Executor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Minimum number of files before worker threads are used
    pub threading_threshold: usize,
    /// Upper bound on the detected worker count
    pub max_threads: usize,
    /// Fixed worker count, bypassing detection
    pub threads: Option<usize>,
    /// How often the progress callback fires while threads run
    pub progress_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            threading_threshold: 5,
            max_threads: 16,
            threads: None,
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// What happened during one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStats {
    pub total_files: usize,
    /// Files that could not be read or parsed
    pub failed_files: usize,
    pub thread_count: usize,
    pub used_threading: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Cannot list directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A SELECT field whose partial path leads to more than one distinct
/// element path in the sampled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousField {
    pub field: String,
    pub paths: usize,
}

/// Progress callback: `(completed, total, thread_count)`.
pub type Progress<'a> = &'a (dyn Fn(usize, usize, usize) + Sync);

pub struct Executor<P = FileSystem> {
    config: ExecutorConfig,
    provider: P,
}

impl Executor<FileSystem> {
    pub fn new(config: ExecutorConfig) -> Self {
        Executor {
            config,
            provider: FileSystem,
        }
    }
}

impl Default for Executor<FileSystem> {
    fn default() -> Self {
        Executor::new(ExecutorConfig::default())
    }
}

impl<P: DocumentProvider> Executor<P> {
    pub fn with_provider(config: ExecutorConfig, provider: P) -> Self {
        Executor { config, provider }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn execute(&self, query: &Query) -> Result<Vec<ResultRow>, ExecuteError> {
        self.execute_with_progress(query, &|_, _, _| {})
            .map(|(rows, _)| rows)
    }

    pub fn execute_with_progress(
        &self,
        query: &Query,
        progress: Progress<'_>,
    ) -> Result<(Vec<ResultRow>, ExecutionStats), ExecuteError> {
        let started = Instant::now();
        let files = collect_files(&query.from_path)?;
        let columns = if query.needs_aggregation() {
            aggregate::source_columns(query)
        } else {
            extract::select_columns(query)
        };

        let threads = scheduler::thread_count(&self.config, files.len());
        let used_threading = files.len() >= self.config.threading_threshold && threads > 1;
        info!(
            "Querying {} file(s) from {} ({})",
            files.len(),
            query.from_path,
            if used_threading {
                format!("{} threads", threads)
            } else {
                "single thread".to_string()
            }
        );

        let work = |path: &Path| self.process_file(query, &columns, path);
        let outcome = if used_threading {
            scheduler::run_threaded(&files, threads, self.config.progress_interval, progress, work)
        } else {
            scheduler::run_sequential(&files, progress, work)
        };

        let rows = if query.needs_aggregation() {
            aggregate::aggregate(query, outcome.rows)
        } else {
            outcome.rows
        };
        let rows = postprocess::finish(query, rows);

        let stats = ExecutionStats {
            total_files: files.len(),
            failed_files: outcome.failed,
            thread_count: if used_threading { threads } else { 1 },
            used_threading,
            elapsed: started.elapsed(),
        };
        debug!(
            "Produced {} row(s) in {:?}, {} file(s) failed",
            rows.len(),
            stats.elapsed,
            stats.failed_files
        );
        Ok((rows, stats))
    }

    /// Rows contributed by one file, before any cross-file step.
    fn process_file(
        &self,
        query: &Query,
        columns: &[Column],
        path: &Path,
    ) -> Result<Vec<ResultRow>, LoadError> {
        let text = self.provider.fetch(path)?;
        let doc = parse_document(path, &text)?;
        let filename = display_name(path);
        let rows = extract::extract_rows(&doc, &filename, query, columns);
        debug!("{}: {} row(s)", filename, rows.len());
        Ok(rows)
    }

    /// SELECT fields that match several distinct element paths in the first
    /// file of the query's source.
    pub fn ambiguous_fields(&self, query: &Query) -> Result<Vec<AmbiguousField>, ExecuteError> {
        let files = collect_files(&query.from_path)?;
        let Some(first) = files.first() else {
            return Ok(Vec::new());
        };
        let text = self.provider.fetch(first)?;
        let doc = parse_document(first, &text)?;

        let mut out = Vec::new();
        for field in &query.select_fields {
            if field.include_filename || field.is_variable_ref() || field.components.is_empty() {
                continue;
            }
            let paths = count_matching_paths(doc.root(), &field.components);
            if paths > 1 {
                out.push(AmbiguousField {
                    field: field.path_string(),
                    paths,
                });
            }
        }
        Ok(out)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

/// The file named by `from`, or the `.xml` files directly inside it when it
/// is a directory, sorted by path.
pub fn collect_files(from: &str) -> Result<Vec<PathBuf>, ExecuteError> {
    let path = expand_home(from);
    if path.is_file() {
        return Ok(vec![path]);
    }
    if !path.is_dir() {
        return Err(ExecuteError::PathNotFound(path));
    }

    let entries = std::fs::read_dir(&path).map_err(|source| ExecuteError::ReadDir {
        path: path.clone(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", path.display(), e);
                continue;
            }
        };
        let file = entry.path();
        let is_xml = file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if is_xml && file.is_file() {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}
