//! Hierarchical (grouped) grid engine
//!
//! Rows of the current page are grouped into a [`GroupTree`] before
//! rendering. Two paging strategies exist, fixed at construction:
//!
//! - client: every row is resident; search and paging run in memory.
//! - server: only `total_count` and a [`PageLoader`] are held; pages are
//!   loaded on the [`WorkerPool`] and applied when the owner calls
//!   [`HierarchicalGrid::poll`].
//!
//! Page loads and each kind of prefetch have their own generation counter. A
//! completion carrying an older generation than the newest request of the
//! same kind is discarded, so the newest request always wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tabula_core::{EventEmitter, Result, RowRecord, SubscriptionId};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::column_layout::ColumnLayout;
use crate::column_state::ColumnState;
use crate::columns::{self, RenderedColumn};
use crate::config::GridConfig;
use crate::events::{GridEvent, PrefetchPurpose};
use crate::export::{ExportRequest, ExportSource, Exporter};
use crate::loader::{PageLoader, SearchDelegate};
use crate::pagination::{PageSizer, Paginator, clamp_page, page_range};
use crate::result_context::ResultContext;
use crate::table_state::TableState;
use crate::tree::{GroupTree, GroupingPathProvider, SingleGroup, VisibleRow};
use crate::worker::{PrefetchOutcome, WorkerPool, load_page_guarded, prefetch_all_pages};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingMode {
    Client,
    Server,
}

enum Paging {
    Client {
        rows: Vec<RowRecord>,
        /// Indices into `rows` matching the search
        filtered: Vec<usize>,
    },
    Server {
        pool: Arc<WorkerPool>,
        loader: Arc<dyn PageLoader>,
        search_delegate: Option<SearchDelegate>,
    },
}

/// Work finished on the pool, waiting to be applied on the owning thread
enum Completion {
    Page {
        generation: u64,
        page_index: usize,
        page_size: usize,
        result: Result<Vec<RowRecord>>,
    },
    Prefetch {
        generation: u64,
        /// Page generation current when the prefetch was dispatched
        page_generation: u64,
        purpose: PrefetchPurpose,
        outcome: PrefetchOutcome,
    },
}

/// One rendered page of a [`HierarchicalGrid`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePage {
    pub page_index: usize,
    pub page_count: usize,
    pub total_count: usize,
    pub columns: Vec<RenderedColumn>,
    pub rows: Vec<VisibleRow>,
    /// A load or prefetch is still running
    pub loading: bool,
}

pub struct HierarchicalGrid {
    config: GridConfig,
    column_state: ColumnState,
    layout: ColumnLayout,
    state: TableState,
    paging: Paging,
    provider: Arc<dyn GroupingPathProvider>,
    headers: Vec<String>,
    /// Rows the current tree was built from
    resident: Vec<RowRecord>,
    tree: GroupTree,
    sizer: PageSizer,
    page_generation: u64,
    expand_generation: u64,
    clean_generation: u64,
    pending_page: Option<usize>,
    in_flight: usize,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    /// Set by the column state listener; the tree is rebuilt on the next tick
    columns_dirty: Arc<AtomicBool>,
    subscription: SubscriptionId,
    events: Arc<EventEmitter<GridEvent>>,
}

impl HierarchicalGrid {
    /// Grid over rows held in memory
    pub fn client(config: GridConfig, column_state: ColumnState) -> Self {
        Self::with_paging(
            config,
            column_state,
            Paging::Client {
                rows: Vec::new(),
                filtered: Vec::new(),
            },
        )
    }

    /// Grid over a paged source of `total_count` rows. Page 0 is requested
    /// right away.
    pub fn server(
        config: GridConfig,
        column_state: ColumnState,
        pool: Arc<WorkerPool>,
        loader: Arc<dyn PageLoader>,
        total_count: usize,
    ) -> Self {
        let mut grid = Self::with_paging(
            config,
            column_state,
            Paging::Server {
                pool,
                loader,
                search_delegate: None,
            },
        );
        grid.state.set_total_count(total_count);
        let page_size = grid.state.rows_per_page();
        grid.request_page(0, page_size);
        grid
    }

    fn with_paging(config: GridConfig, column_state: ColumnState, paging: Paging) -> Self {
        let columns_dirty = Arc::new(AtomicBool::new(false));
        let flag = columns_dirty.clone();
        let subscription = column_state.subscribe(move |_| flag.store(true, Ordering::Release));

        let mut sizer = PageSizer::new(config.row_height(), config.resize_hysteresis());
        sizer.set_applied(config.rows_per_page());
        let (completions_tx, completions_rx) = unbounded_channel();

        Self {
            layout: ColumnLayout::delegating("tree", column_state.clone()),
            state: TableState::new(config.rows_per_page()),
            column_state,
            paging,
            provider: Arc::new(SingleGroup),
            headers: Vec::new(),
            resident: Vec::new(),
            tree: GroupTree::default(),
            sizer,
            page_generation: 0,
            expand_generation: 0,
            clean_generation: 0,
            pending_page: None,
            in_flight: 0,
            completions_tx,
            completions_rx,
            columns_dirty,
            subscription,
            events: Arc::new(EventEmitter::new()),
            config,
        }
    }

    pub fn with_grouping(mut self, provider: Arc<dyn GroupingPathProvider>) -> Self {
        self.provider = provider;
        self.rebuild_tree();
        self
    }

    /// Replace the grouping and rebuild the tree
    pub fn set_grouping(&mut self, provider: Arc<dyn GroupingPathProvider>) {
        self.provider = provider;
        self.state.clear_expansion();
        self.rebuild_tree();
    }

    pub fn subscribe(&self, listener: impl Fn(&GridEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn mode(&self) -> PagingMode {
        match self.paging {
            Paging::Client { .. } => PagingMode::Client,
            Paging::Server { .. } => PagingMode::Server,
        }
    }

    // --- data ---------------------------------------------------------------

    /// Replace the in-memory rows. Ignored in server mode.
    pub fn populate(&mut self, rows: Vec<RowRecord>) -> bool {
        let Paging::Client { rows: held, .. } = &mut self.paging else {
            tracing::warn!("populate ignored: grid is server paged");
            return false;
        };
        tracing::debug!(rows = rows.len(), "tree grid populated");
        *held = rows;
        self.refilter();
        self.state.set_page_index(0);
        self.state.clear_expansion();
        self.rebuild_page();
        self.emit_page_changed();
        true
    }

    /// Swap the loader and total of a server-paged grid and reload page 0
    pub fn set_page_loader(&mut self, new_loader: Arc<dyn PageLoader>, total_count: usize) -> bool {
        let Paging::Server { loader, .. } = &mut self.paging else {
            tracing::warn!("page loader ignored: grid is client paged");
            return false;
        };
        *loader = new_loader;
        self.state.set_total_count(total_count);
        self.state.clear_expansion();
        let page_size = self.state.rows_per_page();
        self.request_page(0, page_size)
    }

    /// Take the loader and total from a shared result context
    pub fn bind_context(&mut self, context: &ResultContext) -> bool {
        match context.page_loader() {
            Some(loader) => self.set_page_loader(loader, context.total_count()),
            None => {
                tracing::warn!("result context has no page loader");
                false
            }
        }
    }

    /// Update the authoritative total of a server-paged grid
    pub fn set_total_count(&mut self, total_count: usize) {
        if self.mode() != PagingMode::Server {
            return;
        }
        self.state.set_total_count(total_count);
        let clamped = clamp_page(self.state.page_index(), total_count, self.state.rows_per_page());
        if clamped != self.state.page_index() {
            let page_size = self.state.rows_per_page();
            self.request_page(clamped, page_size);
        }
    }

    pub fn set_search_delegate(&mut self, delegate: SearchDelegate) -> bool {
        let Paging::Server { search_delegate, .. } = &mut self.paging else {
            tracing::warn!("search delegate ignored: grid is client paged");
            return false;
        };
        *search_delegate = Some(delegate);
        true
    }

    /// Filter the rows (client) or hand the text to the search delegate (server)
    pub fn set_search_text(&mut self, text: &str) {
        self.state.set_search_text(text);

        if self.mode() == PagingMode::Client {
            self.refilter();
            self.state.set_page_index(0);
            self.rebuild_page();
            self.events.emit(&GridEvent::SearchChanged {
                text: text.to_string(),
                matches: Some(self.state.total_count()),
            });
            self.emit_page_changed();
            return;
        }

        let delegate = match &self.paging {
            Paging::Server {
                search_delegate, ..
            } => search_delegate.clone(),
            Paging::Client { .. } => None,
        };

        match delegate {
            Some(delegate) => {
                tracing::debug!(text, "delegating server search");
                delegate(text);
                self.events.emit(&GridEvent::SearchChanged {
                    text: text.to_string(),
                    matches: None,
                });
            }
            None => tracing::warn!(text, "no server search delegate registered, search ignored"),
        }
    }

    fn refilter(&mut self) {
        let needle = self.state.search_needle();
        let Paging::Client { rows, filtered } = &mut self.paging else {
            return;
        };
        *filtered = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.contains_text(&needle))
            .map(|(ix, _)| ix)
            .collect();
        let count = filtered.len();
        let headers = filtered.first().map(|&ix| columns::headers_of(&rows[ix]));

        self.state.set_total_count(count);
        if let Some(headers) = headers {
            self.adopt_headers(headers);
        }
    }

    fn adopt_headers(&mut self, headers: Vec<String>) {
        self.headers = headers;
        self.layout.merge_headers(&self.headers);
        self.events.emit(&GridEvent::ColumnsRebuilt {
            count: self.columns().len(),
        });
    }

    /// Client mode: make the current page resident and regroup it
    fn rebuild_page(&mut self) {
        let Paging::Client { rows, filtered } = &self.paging else {
            return;
        };
        let range = page_range(
            self.state.page_index(),
            self.state.rows_per_page(),
            filtered.len(),
        );
        self.resident = filtered[range].iter().map(|&ix| rows[ix].clone()).collect();
        self.state.mark_data_changed();
        self.rebuild_tree();
    }

    fn rebuild_tree(&mut self) {
        self.columns_dirty.store(false, Ordering::Release);
        let columns = self.columns();
        self.tree = GroupTree::build(
            &self.resident,
            self.provider.as_ref(),
            &columns,
            self.config.default_group_label(),
        );
    }

    fn refresh_if_columns_changed(&mut self) {
        if self.columns_dirty.swap(false, Ordering::AcqRel) {
            tracing::debug!("shared column state changed, regrouping");
            self.rebuild_tree();
        }
    }

    // --- paging -------------------------------------------------------------

    pub fn page_index(&self) -> usize {
        self.state.page_index()
    }

    pub fn page_count(&self) -> usize {
        self.state.page_count()
    }

    pub fn rows_per_page(&self) -> usize {
        self.state.rows_per_page()
    }

    /// Filtered rows in client mode, the supplied total in server mode
    pub fn total_count(&self) -> usize {
        self.state.total_count()
    }

    /// Page requested from the loader and not yet applied
    pub fn pending_page(&self) -> Option<usize> {
        self.pending_page
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    fn paginator(&self) -> Paginator {
        Paginator::new(
            self.state.page_index(),
            self.state.rows_per_page(),
            self.state.total_count(),
        )
    }

    /// Show `page_index`. In server mode the page is loaded in the background
    /// and becomes current once applied by [`Self::poll`].
    pub fn go_to_page(&mut self, page_index: usize) -> bool {
        if page_index >= self.page_count() {
            tracing::warn!(page_index, page_count = self.page_count(), "page out of range");
            return false;
        }
        match self.mode() {
            PagingMode::Client => {
                if page_index != self.state.page_index() {
                    self.state.set_page_index(page_index);
                    self.rebuild_page();
                    self.emit_page_changed();
                }
                true
            }
            PagingMode::Server => {
                let page_size = self.state.rows_per_page();
                self.request_page(page_index, page_size)
            }
        }
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

    /// Change the page size. The current page is kept if it is still valid,
    /// otherwise it is clamped to the new last page.
    ///
    /// In server mode the new size and page only take effect once the page
    /// load succeeds.
    pub fn set_rows_per_page(&mut self, rows_per_page: usize) -> bool {
        if rows_per_page == 0 {
            tracing::warn!("rows per page must be greater than 0");
            return false;
        }
        if rows_per_page == self.state.rows_per_page() {
            return true;
        }
        self.sizer.set_applied(rows_per_page);
        let page = clamp_page(self.state.page_index(), self.state.total_count(), rows_per_page);
        tracing::debug!(rows_per_page, page, "page size changed");

        match self.mode() {
            PagingMode::Client => {
                self.state.set_rows_per_page(rows_per_page);
                self.state.set_page_index(page);
                self.rebuild_page();
                self.emit_page_changed();
                true
            }
            PagingMode::Server => self.request_page(page, rows_per_page),
        }
    }

    /// Recompute the page size from the available height, applying it only
    /// outside the hysteresis band
    pub fn on_viewport_resized(&mut self, height: f32) -> bool {
        match self.sizer.on_viewport_height(height) {
            Some(rows) => self.set_rows_per_page(rows),
            None => false,
        }
    }

    fn next_prefetch_generation(&mut self, purpose: PrefetchPurpose) -> u64 {
        let generation = match purpose {
            PrefetchPurpose::ExpandAll => &mut self.expand_generation,
            PrefetchPurpose::CleanColumns => &mut self.clean_generation,
        };
        *generation += 1;
        *generation
    }

    fn prefetch_generation(&self, purpose: PrefetchPurpose) -> u64 {
        match purpose {
            PrefetchPurpose::ExpandAll => self.expand_generation,
            PrefetchPurpose::CleanColumns => self.clean_generation,
        }
    }

    /// Load `page_index` at `page_size`. Both are committed to the table
    /// state only when the load succeeds.
    fn request_page(&mut self, page_index: usize, page_size: usize) -> bool {
        let Paging::Server { pool, loader, .. } = &self.paging else {
            return false;
        };
        let pool = pool.clone();
        let loader = loader.clone();
        self.page_generation += 1;
        let generation = self.page_generation;
        self.pending_page = Some(page_index);
        self.in_flight += 1;

        tracing::debug!(page_index, page_size, generation, "page load dispatched");
        let tx = self.completions_tx.clone();
        pool.spawn(move || {
            let result = load_page_guarded(loader.as_ref(), page_index, page_size);
            let completion = Completion::Page {
                generation,
                page_index,
                page_size,
                result,
            };
            if tx.send(completion).is_err() {
                tracing::debug!(page_index, "grid dropped before page load finished");
            }
        });
        true
    }

    fn request_prefetch(&mut self, purpose: PrefetchPurpose) -> bool {
        let Paging::Server { pool, loader, .. } = &self.paging else {
            return false;
        };
        let pool = pool.clone();
        let loader = loader.clone();
        let total_count = self.state.total_count();
        let page_size = self.state.rows_per_page();
        let generation = self.next_prefetch_generation(purpose);
        let page_generation = self.page_generation;
        self.in_flight += 1;

        tracing::info!(?purpose, total_count, page_size, "prefetching every page");
        let tx = self.completions_tx.clone();
        pool.spawn(move || {
            let outcome = prefetch_all_pages(loader.as_ref(), total_count, page_size);
            let completion = Completion::Prefetch {
                generation,
                page_generation,
                purpose,
                outcome,
            };
            if tx.send(completion).is_err() {
                tracing::debug!(?purpose, "grid dropped before prefetch finished");
            }
        });
        true
    }

    // --- completion handoff -------------------------------------------------

    /// Apply finished background work without blocking. Returns the number of
    /// completions drained.
    pub fn poll(&mut self) -> usize {
        self.refresh_if_columns_changed();
        let mut drained = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion);
            drained += 1;
        }
        drained
    }

    /// Block until one piece of background work finishes and apply it, along
    /// with anything else already queued. Returns false when nothing is running.
    pub fn wait_for_completion(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.completions_rx.blocking_recv() {
            Some(completion) => {
                self.apply(completion);
                self.poll();
                true
            }
            None => false,
        }
    }

    /// Block until every dispatched load and prefetch was applied
    pub fn wait_idle(&mut self) {
        while self.wait_for_completion() {}
    }

    fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Page {
                generation,
                page_index,
                page_size,
                result,
            } => {
                if generation != self.page_generation {
                    tracing::debug!(
                        page_index,
                        generation,
                        current = self.page_generation,
                        "discarding stale page load"
                    );
                    self.events
                        .emit(&GridEvent::StaleLoadDiscarded { page_index });
                    return;
                }
                self.pending_page = None;
                match result {
                    Ok(rows) => self.apply_page(page_index, page_size, rows),
                    Err(e) => {
                        tracing::error!(page_index, page_size, error = %e, "page load failed");
                        self.sizer.set_applied(self.state.rows_per_page());
                        self.events.emit(&GridEvent::LoadFailed {
                            page_index,
                            message: e.to_string(),
                        });
                    }
                }
            }
            Completion::Prefetch {
                generation,
                page_generation,
                purpose,
                outcome,
            } => {
                if generation != self.prefetch_generation(purpose) {
                    tracing::debug!(?purpose, generation, "discarding superseded prefetch");
                    self.events.emit(&GridEvent::PrefetchDiscarded { purpose });
                    return;
                }
                // Expanded rows replace the resident page, so navigating
                // after the request wins over it
                if purpose == PrefetchPurpose::ExpandAll && page_generation != self.page_generation {
                    tracing::debug!(?purpose, "page requested after expand-all, dropping prefetch");
                    self.events.emit(&GridEvent::PrefetchDiscarded { purpose });
                    return;
                }
                self.apply_prefetch(purpose, outcome);
            }
        }
    }

    fn apply_page(&mut self, page_index: usize, page_size: usize, rows: Vec<RowRecord>) {
        tracing::debug!(page_index, page_size, rows = rows.len(), "page applied");
        if let Some(first) = rows.first() {
            self.adopt_headers(columns::headers_of(first));
        }
        self.state.set_rows_per_page(page_size);
        self.state.set_page_index(page_index);
        self.state.mark_data_changed();
        self.resident = rows;
        self.rebuild_tree();
        self.emit_page_changed();
    }

    fn apply_prefetch(&mut self, purpose: PrefetchPurpose, outcome: PrefetchOutcome) {
        let PrefetchOutcome {
            rows, failed_pages, ..
        } = outcome;
        let row_count = rows.len();

        match purpose {
            PrefetchPurpose::ExpandAll => {
                if let Some(first) = rows.first() {
                    self.adopt_headers(columns::headers_of(first));
                }
                // A page load still in flight predates the prefetch
                if self.pending_page.take().is_some() {
                    self.page_generation += 1;
                }
                self.resident = rows;
                self.state.mark_data_changed();
                self.rebuild_tree();
                self.tree.set_all_expanded(&mut self.state, true);
            }
            PrefetchPurpose::CleanColumns => {
                if let Some(first) = rows.first() {
                    self.adopt_headers(columns::headers_of(first));
                }
                let empty = columns::empty_column_keys(&rows, &self.columns());
                self.state.set_clean_applied();
                if !empty.is_empty() {
                    self.delete_columns(&empty);
                }
                self.rebuild_tree();
                tracing::info!(removed = empty.len(), "cleaned empty columns across all pages");
            }
        }

        self.events.emit(&GridEvent::PrefetchCompleted {
            purpose,
            rows: row_count,
            failed_pages,
        });
    }

    // --- tree ---------------------------------------------------------------

    /// Columns currently rendered
    pub fn columns(&self) -> Vec<RenderedColumn> {
        columns::visible_columns(&self.headers, &self.layout, &self.column_state)
    }

    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }

    /// Rows the current tree was built from
    pub fn resident_rows(&self) -> &[RowRecord] {
        &self.resident
    }

    pub fn render(&mut self) -> TreePage {
        self.refresh_if_columns_changed();
        TreePage {
            page_index: self.state.page_index(),
            page_count: self.page_count(),
            total_count: self.state.total_count(),
            columns: self.columns(),
            rows: self.tree.visible_rows(&self.state),
            loading: self.is_loading(),
        }
    }

    /// Expand every group. In server mode every page is prefetched first and
    /// the tree is rebuilt over the whole result once the prefetch is applied.
    pub fn expand_all(&mut self) -> bool {
        match self.mode() {
            PagingMode::Client => {
                self.tree.set_all_expanded(&mut self.state, true);
                true
            }
            PagingMode::Server => self.request_prefetch(PrefetchPurpose::ExpandAll),
        }
    }

    pub fn collapse_all(&mut self) {
        self.state.clear_expansion();
    }

    /// Flip one group. Returns the new flag, or `None` for an unknown group.
    pub fn toggle_node(&mut self, key: &str) -> Option<bool> {
        if self.tree.group(key).is_none() {
            tracing::warn!(key, "toggle ignored: unknown group");
            return None;
        }
        Some(self.state.toggle_expanded(key))
    }

    pub fn set_expanded(&mut self, key: &str, expanded: bool) -> bool {
        if self.tree.group(key).is_none() {
            tracing::warn!(key, "expansion ignored: unknown group");
            return false;
        }
        self.state.set_expanded(key, expanded);
        true
    }

    // --- column lifecycle ---------------------------------------------------

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
            self.rebuild_tree();
            self.events.emit(&GridEvent::ColumnsDeleted {
                keys: keys.to_vec(),
            });
        }
        added
    }

    /// Delete the columns blank on every rendered leaf.
    ///
    /// Runs once per data change; repeated calls are no-ops until a new page
    /// arrives or [`Self::mark_data_changed`] is called.
    pub fn clean_empty_columns(&mut self) -> Vec<String> {
        if self.state.is_clean_applied() {
            tracing::debug!("clean already applied to this page");
            return Vec::new();
        }
        let leaves = self.tree.leaf_row_indices();
        let empty = columns::empty_column_keys(
            leaves.iter().map(|&ix| &self.resident[ix]),
            &self.columns(),
        );
        self.state.set_clean_applied();
        if !empty.is_empty() {
            self.delete_columns(&empty);
        }
        tracing::info!(removed = empty.len(), "cleaned empty columns");
        empty
    }

    /// Clean against the whole result rather than one page. Server mode
    /// prefetches every page first and finishes in [`Self::poll`].
    pub fn clean_columns_all_pages(&mut self) -> bool {
        let Paging::Client { rows, filtered } = &self.paging else {
            return self.request_prefetch(PrefetchPurpose::CleanColumns);
        };
        let empty = columns::empty_column_keys(
            filtered.iter().map(|&ix| &rows[ix]),
            &self.columns(),
        );
        self.state.set_clean_applied();
        if !empty.is_empty() {
            self.delete_columns(&empty);
        }
        tracing::info!(removed = empty.len(), "cleaned empty columns across all rows");
        true
    }

    pub fn mark_data_changed(&mut self) {
        self.state.mark_data_changed();
    }

    /// Rebuild the layout from the current headers and restore every hidden column
    pub fn reset_columns(&mut self) {
        self.layout.apply_default_from_headers(&self.headers);
        self.state.mark_data_changed();
        self.rebuild_tree();
        self.events.emit(&GridEvent::ColumnsRebuilt {
            count: self.columns().len(),
        });
    }

    /// Hand the visible columns and the rows (client) or the loader (server)
    /// to `exporter`
    pub fn export(&self, exporter: &dyn Exporter) -> Result<()> {
        let source = match &self.paging {
            Paging::Client { rows, filtered } => {
                ExportSource::Rows(filtered.iter().map(|&ix| rows[ix].clone()).collect())
            }
            Paging::Server { loader, .. } => ExportSource::Loader {
                loader: loader.clone(),
                total_count: self.state.total_count(),
                page_size: self.state.rows_per_page(),
            },
        };
        exporter.export(ExportRequest::new(&self.columns(), source))
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

impl Drop for HierarchicalGrid {
    fn drop(&mut self) {
        self.column_state.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for HierarchicalGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchicalGrid")
            .field("mode", &self.mode())
            .field("state", &self.state)
            .field("resident", &self.resident.len())
            .field("page_generation", &self.page_generation)
            .field("pending_page", &self.pending_page)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ColumnGrouping;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<RowRecord> {
        ["east", "east", "west", "west", "west"]
            .iter()
            .enumerate()
            .map(|(i, region)| {
                RowRecord::new()
                    .with("id", i.to_string())
                    .with("region", *region)
                    .with("memo", "")
            })
            .collect()
    }

    fn client_grid(rows_per_page: usize) -> HierarchicalGrid {
        let mut grid = HierarchicalGrid::client(GridConfig::new(rows_per_page), ColumnState::new())
            .with_grouping(Arc::new(ColumnGrouping::new(["region"])));
        grid.populate(rows());
        grid
    }

    #[test]
    fn test_client_page_is_grouped() {
        let mut grid = client_grid(10);
        let page = grid.render();
        let labels: Vec<String> = page
            .rows
            .iter()
            .filter_map(|row| match row {
                VisibleRow::Group { label, .. } => Some(label.clone()),
                VisibleRow::Leaf { .. } => None,
            })
            .collect();
        assert_eq!(labels, vec!["east", "west"]);
    }

    #[test]
    fn test_expand_and_collapse_all_in_client_mode() {
        let mut grid = client_grid(10);
        assert!(grid.expand_all());
        assert_eq!(grid.render().rows.len(), 7);
        grid.collapse_all();
        assert_eq!(grid.render().rows.len(), 2);
        assert_eq!(grid.toggle_node("west"), Some(true));
        assert_eq!(grid.render().rows.len(), 5);
        assert_eq!(grid.toggle_node("north"), None);
    }

    #[test]
    fn test_populate_is_refused_in_server_mode() {
        let pool = WorkerPool::shared(1).unwrap();
        let loader: Arc<dyn PageLoader> = Arc::new(crate::loader::MemoryPageLoader::new(rows()));
        let mut grid =
            HierarchicalGrid::server(GridConfig::new(2), ColumnState::new(), pool, loader, 5);
        assert!(!grid.populate(rows()));
        grid.wait_idle();
        assert_eq!(grid.resident_rows().len(), 2);
    }
}
