//! Bounded background worker pool
//!
//! Page loads and multi-page prefetches run here so the thread that owns the
//! engines never blocks on a [`PageLoader`]. Results are handed back through
//! a channel that the owning thread drains (see `HierarchicalGrid::poll`).

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tabula_core::{Result, RowRecord, TabulaError};

use crate::loader::PageLoader;
use crate::pagination::page_count;

/// Fixed-size pool backed by a dedicated tokio runtime
pub struct WorkerPool {
    runtime: tokio::runtime::Runtime,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool running at most `workers` jobs at once
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        // Jobs only ever run on the blocking pool, which carries the bound
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("tabula-worker")
            .enable_all()
            .build()?;

        tracing::debug!(workers, "worker pool started");
        Ok(Self { runtime, workers })
    }

    /// Create a pool behind an `Arc`, ready to share between engines
    pub fn shared(workers: usize) -> Result<Arc<Self>> {
        Self::new(workers).map(Arc::new)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run a blocking job on the pool. Jobs beyond the pool size queue up.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.runtime.spawn_blocking(job));
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

/// Call the loader, turning a panic into an error so the job always reports back
pub fn load_page_guarded(
    loader: &dyn PageLoader,
    page_index: usize,
    page_size: usize,
) -> Result<Vec<RowRecord>> {
    let span = tracing::debug_span!("load_page", page_index, page_size);
    let _enter = span.enter();

    match catch_unwind(AssertUnwindSafe(|| loader.load_page(page_index, page_size))) {
        Ok(result) => result,
        Err(_) => Err(TabulaError::page_load(format!(
            "page loader panicked while loading page {}",
            page_index
        ))),
    }
}

/// Rows gathered by a multi-page prefetch
#[derive(Debug, Clone, Default)]
pub struct PrefetchOutcome {
    pub rows: Vec<RowRecord>,
    /// Pages whose load failed; their rows are missing from `rows`
    pub failed_pages: Vec<usize>,
    pub pages_requested: usize,
}

/// Load every page of a `total_count`-row result, one loader call per page.
///
/// Individual page failures are logged and skipped; the outcome holds
/// whatever loaded successfully, in page order.
pub fn prefetch_all_pages(
    loader: &dyn PageLoader,
    total_count: usize,
    page_size: usize,
) -> PrefetchOutcome {
    let pages = if total_count == 0 {
        0
    } else {
        page_count(total_count, page_size)
    };
    let span = tracing::info_span!("prefetch_all_pages", total_count, page_size, pages);
    let _enter = span.enter();

    let mut outcome = PrefetchOutcome {
        rows: Vec::with_capacity(total_count),
        failed_pages: Vec::new(),
        pages_requested: pages,
    };

    for page_index in 0..pages {
        match load_page_guarded(loader, page_index, page_size) {
            Ok(rows) => outcome.rows.extend(rows),
            Err(e) => {
                tracing::warn!(page_index, error = %e, "prefetch page failed, omitting its rows");
                outcome.failed_pages.push(page_index);
            }
        }
    }

    tracing::info!(
        rows = outcome.rows.len(),
        failed = outcome.failed_pages.len(),
        "prefetch finished"
    );
    outcome
}
