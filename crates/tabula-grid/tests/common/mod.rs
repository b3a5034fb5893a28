//! Common test utilities and mocks
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tabula_core::{Result, RowRecord, TabulaError};
use tabula_grid::{GridEvent, PageLoader, page_range};

/// Blocks loader calls until released
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    released: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.released.wait(&mut open);
        }
    }

    pub fn release(&self) {
        *self.open.lock() = true;
        self.released.notify_all();
    }
}

/// Page loader over an in-memory result with failure injection.
///
/// Every call is recorded as `(page_index, page_size)` so tests can assert
/// how many loads an operation issued.
pub struct MockPageLoader {
    rows: Vec<RowRecord>,
    /// Pages whose load returns an error
    pub failing_pages: Vec<usize>,
    /// Page whose load blocks until the gate opens
    pub gated_page: Option<(usize, Arc<Gate>)>,
    pub call_log: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl MockPageLoader {
    pub fn new(rows: Vec<RowRecord>) -> Self {
        Self {
            rows,
            failing_pages: vec![],
            gated_page: None,
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_failing_page(mut self, page_index: usize) -> Self {
        self.failing_pages.push(page_index);
        self
    }

    pub fn with_gated_page(mut self, page_index: usize, gate: Arc<Gate>) -> Self {
        self.gated_page = Some((page_index, gate));
        self
    }

    pub fn total_count(&self) -> usize {
        self.rows.len()
    }

    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.call_log.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().len()
    }
}

impl PageLoader for MockPageLoader {
    fn load_page(&self, page_index: usize, page_size: usize) -> Result<Vec<RowRecord>> {
        self.call_log.lock().push((page_index, page_size));

        if let Some((gated, gate)) = &self.gated_page {
            if *gated == page_index {
                gate.wait();
            }
        }
        if self.failing_pages.contains(&page_index) {
            return Err(TabulaError::page_load(format!(
                "page {} unavailable",
                page_index
            )));
        }
        let range = page_range(page_index, page_size, self.rows.len());
        Ok(self.rows[range].to_vec())
    }
}

/// `n` rows with `id`, `name`, `region` and a `comment` that is blank on
/// every row
pub fn sample_rows(n: usize) -> Vec<RowRecord> {
    (0..n)
        .map(|i| {
            RowRecord::new()
                .with("id", i.to_string())
                .with("name", format!("Customer {}", i))
                .with("region", if i % 3 == 0 { "North" } else { "South" })
                .with("comment", "")
        })
        .collect()
}

/// `n` rows whose `comment` is filled only on row `filled`
pub fn rows_with_single_comment(n: usize, filled: usize) -> Vec<RowRecord> {
    sample_rows(n)
        .into_iter()
        .enumerate()
        .map(|(i, mut row)| {
            if i == filled {
                row.insert("comment", "call back");
            }
            row
        })
        .collect()
}

/// Rows 0..split in "RegionA", the rest in "RegionB"
pub fn regional_rows(total: usize, split: usize) -> Vec<RowRecord> {
    (0..total)
        .map(|i| {
            RowRecord::new()
                .with("id", i.to_string())
                .with("region", if i < split { "RegionA" } else { "RegionB" })
        })
        .collect()
}

/// Values of `key` in row order
pub fn column_values(rows: &[RowRecord], key: &str) -> Vec<String> {
    rows.iter()
        .map(|row| row.value_or_empty(key).to_string())
        .collect()
}

/// Collects engine events for assertions
pub fn event_sink() -> (
    Arc<Mutex<Vec<GridEvent>>>,
    impl Fn(&GridEvent) + Send + Sync + 'static,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (events, move |event: &GridEvent| sink.lock().push(event.clone()))
}
