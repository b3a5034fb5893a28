//! Provenance of the displayed result set
//!
//! A [`ResultContext`] is shared (by cloning) between the engines that show
//! the same result: it carries the mode the rows came from, the active query
//! filter, the authoritative total and the loader that serves its pages.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tabula_core::{EventEmitter, SubscriptionId};

use crate::loader::PageLoader;

/// Where the current rows came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResultMode {
    /// Rows produced by running a query
    #[default]
    ExecutedQuery,
    /// Rows produced by a free-text search
    FreeTextSearch,
}

impl ResultMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ExecutedQuery => "Executed Query",
            Self::FreeTextSearch => "Free-Text Search",
        }
    }
}

/// Events emitted by [`ResultContext`]
#[derive(Clone, Debug, PartialEq)]
pub enum ResultContextEvent {
    ModeChanged(ResultMode),
    FilterChanged,
    TotalCountChanged(usize),
    Cleared,
}

#[derive(Default)]
struct Inner {
    mode: ResultMode,
    query_filter: String,
    total_count: usize,
    page_loader: Option<Arc<dyn PageLoader>>,
}

/// Shared description of the active result set
#[derive(Clone, Default)]
pub struct ResultContext {
    inner: Arc<RwLock<Inner>>,
    events: Arc<EventEmitter<ResultContextEvent>>,
}

impl ResultContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&ResultContextEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Switch mode. A mode switch always comes with the loader serving it.
    pub fn set_mode(&self, mode: ResultMode, loader: Arc<dyn PageLoader>, total_count: usize) {
        {
            let mut inner = self.inner.write();
            inner.mode = mode;
            inner.page_loader = Some(loader);
            inner.total_count = total_count;
        }
        tracing::debug!(mode = mode.display_name(), total_count, "result context mode set");
        self.events.emit(&ResultContextEvent::ModeChanged(mode));
    }

    pub fn mode(&self) -> ResultMode {
        self.inner.read().mode
    }

    pub fn set_query_filter(&self, filter: impl Into<String>) {
        self.inner.write().query_filter = filter.into();
        self.events.emit(&ResultContextEvent::FilterChanged);
    }

    pub fn query_filter(&self) -> String {
        self.inner.read().query_filter.clone()
    }

    pub fn set_total_count(&self, total_count: usize) {
        self.inner.write().total_count = total_count;
        self.events
            .emit(&ResultContextEvent::TotalCountChanged(total_count));
    }

    pub fn total_count(&self) -> usize {
        self.inner.read().total_count
    }

    pub fn page_loader(&self) -> Option<Arc<dyn PageLoader>> {
        self.inner.read().page_loader.clone()
    }

    /// Derived: there is something to export
    pub fn export_possible(&self) -> bool {
        self.inner.read().total_count > 0
    }

    /// Forget the loader, filter and total; mode returns to the default
    pub fn clear(&self) {
        *self.inner.write() = Inner::default();
        self.events.emit(&ResultContextEvent::Cleared);
    }
}

impl std::fmt::Debug for ResultContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ResultContext")
            .field("mode", &inner.mode)
            .field("query_filter", &inner.query_filter)
            .field("total_count", &inner.total_count)
            .field("has_loader", &inner.page_loader.is_some())
            .finish()
    }
}
