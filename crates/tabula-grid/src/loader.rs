//! Page loader contract
//!
//! Server-paged views never hold the whole result; they ask a [`PageLoader`]
//! for one page at a time from a background worker.

use std::sync::Arc;

use tabula_core::{Result, RowRecord};

/// Fetches one page of rows. Called from worker threads; may block on I/O.
pub trait PageLoader: Send + Sync {
    fn load_page(&self, page_index: usize, page_size: usize) -> Result<Vec<RowRecord>>;
}

impl<F> PageLoader for F
where
    F: Fn(usize, usize) -> Result<Vec<RowRecord>> + Send + Sync,
{
    fn load_page(&self, page_index: usize, page_size: usize) -> Result<Vec<RowRecord>> {
        self(page_index, page_size)
    }
}

/// Callback receiving the search text in server mode, where the engine
/// cannot filter rows it does not hold
pub type SearchDelegate = Arc<dyn Fn(&str) + Send + Sync>;

/// Serves pages out of an in-memory row buffer
///
/// Used by the terminal front-end to exercise server paging over a local file.
#[derive(Debug, Clone)]
pub struct MemoryPageLoader {
    rows: Arc<Vec<RowRecord>>,
}

impl MemoryPageLoader {
    pub fn new(rows: Vec<RowRecord>) -> Self {
        Self {
            rows: Arc::new(rows),
        }
    }

    pub fn total_count(&self) -> usize {
        self.rows.len()
    }
}

impl PageLoader for MemoryPageLoader {
    fn load_page(&self, page_index: usize, page_size: usize) -> Result<Vec<RowRecord>> {
        let range = crate::pagination::page_range(page_index, page_size, self.rows.len());
        Ok(self.rows[range].to_vec())
    }
}
