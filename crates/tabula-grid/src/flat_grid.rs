//! Flat (ungrouped) grid engine
//!
//! Holds the whole result in memory, filters it by free text and pages it on
//! the client. Columns come from the first row of the filtered set.

use std::sync::Arc;

use tabula_core::{EventEmitter, Result, RowRecord, SubscriptionId};

use crate::column_layout::ColumnLayout;
use crate::column_state::ColumnState;
use crate::columns::{self, RenderedColumn};
use crate::config::GridConfig;
use crate::events::GridEvent;
use crate::export::{ExportRequest, ExportSource, Exporter};
use crate::pagination::{PageSizer, Paginator, page_range};
use crate::table_state::TableState;

/// One rendered page of a [`FlatGrid`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatPage {
    pub page_index: usize,
    pub page_count: usize,
    /// Rows matching the search, across all pages
    pub total_count: usize,
    pub columns: Vec<RenderedColumn>,
    pub rows: Vec<Vec<String>>,
}

pub struct FlatGrid {
    config: GridConfig,
    column_state: ColumnState,
    layout: ColumnLayout,
    state: TableState,
    rows: Vec<RowRecord>,
    /// Indices into `rows` that match the search
    filtered: Vec<usize>,
    /// Headers of the first filtered row seen last
    headers: Vec<String>,
    paginated: bool,
    sizer: PageSizer,
    events: Arc<EventEmitter<GridEvent>>,
}

impl FlatGrid {
    pub fn new(config: GridConfig, column_state: ColumnState) -> Self {
        let mut sizer = PageSizer::new(config.row_height(), config.resize_hysteresis());
        sizer.set_applied(config.rows_per_page());

        Self {
            layout: ColumnLayout::delegating("flat", column_state.clone()),
            state: TableState::new(config.rows_per_page()),
            column_state,
            config,
            rows: Vec::new(),
            filtered: Vec::new(),
            headers: Vec::new(),
            paginated: true,
            sizer,
            events: Arc::new(EventEmitter::new()),
        }
    }

    /// Render every filtered row on a single page when `paginated` is false
    pub fn with_pagination(mut self, paginated: bool) -> Self {
        self.paginated = paginated;
        self
    }

    pub fn subscribe(&self, listener: impl Fn(&GridEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Replace the data. The active search is applied and paging restarts.
    pub fn populate(&mut self, rows: Vec<RowRecord>) {
        tracing::debug!(rows = rows.len(), "flat grid populated");
        self.rows = rows;
        self.state.mark_data_changed();
        self.refilter();
        self.state.set_page_index(0);
        self.emit_page_changed();
    }

    pub fn set_search_text(&mut self, text: &str) {
        self.state.set_search_text(text);
        self.refilter();
        self.state.set_page_index(0);
        self.state.mark_data_changed();

        self.events.emit(&GridEvent::SearchChanged {
            text: text.to_string(),
            matches: Some(self.filtered.len()),
        });
        self.emit_page_changed();
    }

    fn refilter(&mut self) {
        let needle = self.state.search_needle();
        self.filtered = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.contains_text(&needle))
            .map(|(ix, _)| ix)
            .collect();
        self.state.set_total_count(self.filtered.len());

        // An empty match set keeps the previous columns
        if let Some(&first) = self.filtered.first() {
            self.headers = columns::headers_of(&self.rows[first]);
            self.layout.merge_headers(&self.headers);
            self.events.emit(&GridEvent::ColumnsRebuilt {
                count: self.columns().len(),
            });
        }
    }

    /// Columns currently rendered
    pub fn columns(&self) -> Vec<RenderedColumn> {
        columns::visible_columns(&self.headers, &self.layout, &self.column_state)
    }

    pub fn filtered_rows(&self) -> Vec<&RowRecord> {
        self.filtered.iter().map(|&ix| &self.rows[ix]).collect()
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_paginated(&self) -> bool {
        self.paginated
    }

    pub fn page_index(&self) -> usize {
        self.state.page_index()
    }

    pub fn rows_per_page(&self) -> usize {
        self.state.rows_per_page()
    }

    pub fn page_count(&self) -> usize {
        if self.paginated {
            self.state.page_count()
        } else {
            1
        }
    }

    fn paginator(&self) -> Paginator {
        Paginator::new(
            self.state.page_index(),
            self.state.rows_per_page(),
            self.state.total_count(),
        )
    }

    /// Show `page_index`. Returns false for a page past the end.
    pub fn go_to_page(&mut self, page_index: usize) -> bool {
        if page_index >= self.page_count() {
            tracing::warn!(page_index, page_count = self.page_count(), "page out of range");
            return false;
        }
        if page_index != self.state.page_index() {
            self.state.set_page_index(page_index);
            self.state.mark_data_changed();
            self.emit_page_changed();
        }
        true
    }

    pub fn next_page(&mut self) -> bool {
        match self.paginator().next() {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    pub fn prev_page(&mut self) -> bool {
        match self.paginator().prev() {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(0)
    }

    pub fn last_page(&mut self) -> bool {
        let last = self.paginator().last();
        self.go_to_page(last)
    }

    /// Change the page size. The current page is kept when still valid,
    /// otherwise it is clamped to the new last page.
    pub fn set_rows_per_page(&mut self, rows_per_page: usize) -> bool {
        if rows_per_page == 0 {
            tracing::warn!("rows per page must be greater than 0");
            return false;
        }
        if rows_per_page == self.state.rows_per_page() {
            return true;
        }
        self.state.set_rows_per_page(rows_per_page);
        self.sizer.set_applied(rows_per_page);
        let clamped = self.paginator().clamp(self.state.page_index());
        self.state.set_page_index(clamped);
        self.state.mark_data_changed();
        self.emit_page_changed();
        true
    }

    /// Recompute the page size from the available height. Returns whether a
    /// new size was applied.
    pub fn on_viewport_resized(&mut self, height: f32) -> bool {
        match self.sizer.on_viewport_height(height) {
            Some(rows) => self.set_rows_per_page(rows),
            None => false,
        }
    }

    /// Rows of the current page, or every filtered row without pagination
    pub fn page_rows(&self) -> Vec<&RowRecord> {
        if !self.paginated {
            return self.filtered_rows();
        }
        let range = page_range(
            self.state.page_index(),
            self.state.rows_per_page(),
            self.filtered.len(),
        );
        self.filtered[range].iter().map(|&ix| &self.rows[ix]).collect()
    }

    pub fn render_page(&self) -> FlatPage {
        let columns = self.columns();
        let rows = self
            .page_rows()
            .into_iter()
            .map(|row| columns::format_cells(row, &columns))
            .collect();
        FlatPage {
            page_index: self.state.page_index(),
            page_count: self.page_count(),
            total_count: self.filtered.len(),
            columns,
            rows,
        }
    }

    pub fn rename_column(&mut self, key: &str, new_name: &str) -> bool {
        if !columns::rename(&mut self.layout, &self.column_state, key, new_name) {
            return false;
        }
        self.events.emit(&GridEvent::ColumnRenamed {
            key: key.to_string(),
            title: new_name.trim().to_string(),
        });
        true
    }

    pub fn delete_column(&mut self, key: &str) -> bool {
        self.delete_columns(&[key.to_string()]) > 0
    }

    /// Remove columns from this view and hide them globally
    pub fn delete_columns(&mut self, keys: &[String]) -> usize {
        let added = columns::delete(&self.column_state, keys);
        if added > 0 {
            self.events.emit(&GridEvent::ColumnsDeleted {
                keys: keys.to_vec(),
            });
        }
        added
    }

    /// Delete the columns that are blank on every row of the current page.
    ///
    /// Runs once per data change; later calls return nothing until new data
    /// arrives or [`Self::mark_data_changed`] is called.
    pub fn clean_empty_columns(&mut self) -> Vec<String> {
        if self.state.is_clean_applied() {
            tracing::debug!("clean already applied to this page");
            return Vec::new();
        }
        let empty = columns::empty_column_keys(self.page_rows(), &self.columns());
        self.state.set_clean_applied();
        if !empty.is_empty() {
            self.delete_columns(&empty);
        }
        tracing::info!(removed = empty.len(), "cleaned empty columns");
        empty
    }

    pub fn mark_data_changed(&mut self) {
        self.state.mark_data_changed();
    }

    /// Rebuild the layout from the current headers and restore every
    /// hidden column
    pub fn reset_columns(&mut self) {
        self.layout.apply_default_from_headers(&self.headers);
        self.state.mark_data_changed();
        self.events.emit(&GridEvent::ColumnsRebuilt {
            count: self.columns().len(),
        });
    }

    /// Hand the visible columns and the filtered rows to `exporter`
    pub fn export(&self, exporter: &dyn Exporter) -> Result<()> {
        let rows = self.filtered_rows().into_iter().cloned().collect();
        exporter.export(ExportRequest::new(&self.columns(), ExportSource::Rows(rows)))
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut ColumnLayout {
        &mut self.layout
    }

    pub fn table_state(&self) -> &TableState {
        &self.state
    }

    pub fn column_state(&self) -> &ColumnState {
        &self.column_state
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    fn emit_page_changed(&self) {
        self.events.emit(&GridEvent::PageChanged {
            page_index: self.state.page_index(),
            page_count: self.page_count(),
        });
    }
}

impl std::fmt::Debug for FlatGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatGrid")
            .field("rows", &self.rows.len())
            .field("filtered", &self.filtered.len())
            .field("state", &self.state)
            .field("paginated", &self.paginated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn people() -> Vec<RowRecord> {
        vec![
            RowRecord::new().with("name", "Alice").with("city", "Paris").with("note", ""),
            RowRecord::new().with("name", "Bob").with("city", "Berlin").with("note", ""),
            RowRecord::new().with("name", "Carol").with("city", "paris").with("note", " "),
        ]
    }

    fn grid(rows_per_page: usize) -> FlatGrid {
        let mut grid = FlatGrid::new(GridConfig::new(rows_per_page), ColumnState::new());
        grid.populate(people());
        grid
    }

    #[test]
    fn test_columns_follow_first_row() {
        let grid = grid(10);
        let keys: Vec<String> = grid.columns().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["name", "city", "note"]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_resets_page() {
        let mut grid = grid(1);
        assert!(grid.go_to_page(2));
        grid.set_search_text("PARIS");
        assert_eq!(grid.page_index(), 0);
        assert_eq!(grid.filtered_count(), 2);
        grid.set_search_text("");
        assert_eq!(grid.filtered_count(), 3);
    }

    #[test]
    fn test_empty_match_keeps_previous_columns() {
        let mut grid = grid(10);
        grid.set_search_text("nobody");
        assert_eq!(grid.filtered_count(), 0);
        assert_eq!(grid.columns().len(), 3);
        assert_eq!(grid.page_count(), 1);
    }

    #[test]
    fn test_clean_runs_once_per_data_change() {
        let mut grid = grid(10);
        assert_eq!(grid.clean_empty_columns(), vec!["note"]);
        assert!(grid.clean_empty_columns().is_empty());
        assert!(grid.column_state().is_hidden("note"));
    }

    #[test]
    fn test_unpaginated_view_shows_everything() {
        let grid = FlatGrid::new(GridConfig::new(1), ColumnState::new()).with_pagination(false);
        let mut grid = grid;
        grid.populate(people());
        assert_eq!(grid.page_count(), 1);
        assert_eq!(grid.render_page().rows.len(), 3);
    }
}
