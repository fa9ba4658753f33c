//! Fan-out of per-file work over scoped worker threads.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::warn;

use super::{ExecutorConfig, Progress};
use crate::{document::LoadError, result::ResultRow};

const POLL_STEP: Duration = Duration::from_millis(50);

/// Rows merged from every file that loaded, plus the failure count.
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub rows: Vec<ResultRow>,
    pub failed: usize,
}

/// Worker count for `files` files: the configured count, or the available
/// parallelism capped at `max_threads` (4 when it cannot be detected).
/// Never more workers than files.
pub(crate) fn thread_count(config: &ExecutorConfig, files: usize) -> usize {
    let wanted = config.threads.unwrap_or_else(|| {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(config.max_threads)
    });
    wanted.min(files).max(1)
}

pub(crate) fn run_sequential<F>(files: &[PathBuf], progress: Progress<'_>, work: F) -> Outcome
where
    F: Fn(&Path) -> Result<Vec<ResultRow>, LoadError>,
{
    let mut outcome = Outcome::default();
    for (i, path) in files.iter().enumerate() {
        match work(path) {
            Ok(rows) => outcome.rows.extend(rows),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                outcome.failed += 1;
            }
        }
        progress(i + 1, files.len(), 1);
    }
    outcome
}

/// Worker `i` takes files `i`, `i + threads`, `i + 2 * threads`, ... Each
/// file's rows are appended in one batch, so rows of a file stay together
/// and in document order while files interleave arbitrarily.
pub(crate) fn run_threaded<F>(
    files: &[PathBuf],
    threads: usize,
    interval: Duration,
    progress: Progress<'_>,
    work: F,
) -> Outcome
where
    F: Fn(&Path) -> Result<Vec<ResultRow>, LoadError> + Sync,
{
    let total = files.len();
    let results = Mutex::new(Vec::new());
    let completed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let monitor = s.spawn(|| {
            let step = interval.min(POLL_STEP).max(Duration::from_millis(1));
            let mut last = Instant::now();
            while !done.load(Ordering::Acquire) {
                thread::sleep(step);
                if last.elapsed() >= interval {
                    progress(completed.load(Ordering::Relaxed), total, threads);
                    last = Instant::now();
                }
            }
        });

        let workers: Vec<_> = (0..threads)
            .map(|worker| {
                let (work, results, completed, failed) = (&work, &results, &completed, &failed);
                s.spawn(move || {
                    for path in files.iter().skip(worker).step_by(threads) {
                        match work(path) {
                            Ok(rows) => results.lock().extend(rows),
                            Err(e) => {
                                warn!("Skipping {}: {}", path.display(), e);
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for handle in workers {
            if handle.join().is_err() {
                warn!("A worker thread panicked");
            }
        }
        done.store(true, Ordering::Release);
        let _ = monitor.join();
    });

    // files left in the stride of a panicked worker count as failed
    let lost = total.saturating_sub(completed.load(Ordering::Relaxed));
    if lost > 0 {
        warn!("{} file(s) were not processed", lost);
    }
    progress(total, total, threads);
    Outcome {
        rows: results.into_inner(),
        failed: failed.load(Ordering::Relaxed) + lost,
    }
}
