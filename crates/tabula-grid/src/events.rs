//! Events published by the grid engines

/// Why a multi-page prefetch ran
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefetchPurpose {
    ExpandAll,
    CleanColumns,
}

/// Engine notifications for the surrounding UI
#[derive(Clone, Debug, PartialEq)]
pub enum GridEvent {
    /// A page became current and its rows are applied
    PageChanged { page_index: usize, page_count: usize },
    /// Rendered columns were derived again
    ColumnsRebuilt { count: usize },
    SearchChanged { text: String, matches: Option<usize> },
    ColumnsDeleted { keys: Vec<String> },
    ColumnRenamed { key: String, title: String },
    /// A page load failed; the previous page stays on screen
    LoadFailed { page_index: usize, message: String },
    PrefetchCompleted {
        purpose: PrefetchPurpose,
        rows: usize,
        failed_pages: Vec<usize>,
    },
    /// A load finished after a newer request superseded it
    StaleLoadDiscarded { page_index: usize },
    /// A prefetch finished after a newer request superseded it
    PrefetchDiscarded { purpose: PrefetchPurpose },
}
