//! Pagination arithmetic and viewport-driven page sizing
//!
//! Shared by the flat and hierarchical engines. Pages are 0-indexed here; the
//! engines only ever expose 0-indexed pages.

use std::ops::Range;

/// Number of pages needed for `total` rows at `page_size` rows per page,
/// clamped to at least 1 so an empty result still has a (blank) first page
pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    // saturating_add keeps very large totals from overflowing
    (total.saturating_add(page_size - 1) / page_size).max(1)
}

/// Row range shown on `page_index`: `p*k .. min((p+1)*k, n)`.
///
/// Pages past the end yield an empty range at `n`.
pub fn page_range(page_index: usize, page_size: usize, total: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let start = page_index.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    start..end
}

/// Clamp `page_index` to the last valid page
pub fn clamp_page(page_index: usize, total: usize, page_size: usize) -> usize {
    page_index.min(page_count(total, page_size) - 1)
}

/// Navigation over a known total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    /// Current page (0-indexed)
    pub current_page: usize,
    /// Rows per page
    pub page_size: usize,
    /// Total rows behind the pages
    pub total: usize,
}

impl Paginator {
    pub fn new(current_page: usize, page_size: usize, total: usize) -> Self {
        Self {
            current_page,
            page_size: page_size.max(1),
            total,
        }
    }

    pub fn page_count(&self) -> usize {
        page_count(self.total, self.page_size)
    }

    /// Offset of the first row of the current page
    pub fn offset(&self) -> usize {
        self.current_page.saturating_mul(self.page_size)
    }

    pub fn can_go_next(&self) -> bool {
        self.current_page + 1 < self.page_count()
    }

    pub fn can_go_prev(&self) -> bool {
        self.current_page > 0
    }

    pub fn next(&self) -> Option<usize> {
        self.can_go_next().then_some(self.current_page + 1)
    }

    pub fn prev(&self) -> Option<usize> {
        self.can_go_prev().then(|| self.current_page - 1)
    }

    pub fn first(&self) -> usize {
        0
    }

    pub fn last(&self) -> usize {
        self.page_count() - 1
    }

    /// Clamp an arbitrary target to the valid page range
    pub fn clamp(&self, page_index: usize) -> usize {
        page_index.min(self.last())
    }
}

/// Converts a viewport height into a page size, with hysteresis.
///
/// A new size is only reported when it differs from the last applied size by
/// more than `hysteresis` rows, so sub-pixel jitter of the viewport does not
/// make the page size oscillate.
#[derive(Debug, Clone)]
pub struct PageSizer {
    row_height: f32,
    hysteresis: usize,
    last_applied: Option<usize>,
}

impl PageSizer {
    pub fn new(row_height: f32, hysteresis: usize) -> Self {
        Self {
            row_height: if row_height > 0.0 { row_height } else { 1.0 },
            hysteresis,
            last_applied: None,
        }
    }

    /// Rows that fit in `height` pixels, at least 1
    pub fn rows_for_height(&self, height: f32) -> usize {
        if height.is_nan() || height <= 0.0 {
            return 1;
        }
        ((height / self.row_height).floor() as usize).max(1)
    }

    /// Record a size applied by other means (user choice, config default)
    pub fn set_applied(&mut self, rows: usize) {
        self.last_applied = Some(rows);
    }

    pub fn last_applied(&self) -> Option<usize> {
        self.last_applied
    }

    /// Returns the new page size when it should be applied, `None` otherwise
    pub fn on_viewport_height(&mut self, height: f32) -> Option<usize> {
        let rows = self.rows_for_height(height);
        match self.last_applied {
            Some(last) if rows.abs_diff(last) <= self.hysteresis => None,
            _ => {
                self.last_applied = Some(rows);
                Some(rows)
            }
        }
    }
}
