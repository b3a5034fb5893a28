//! Hand-off to external exporters
//!
//! The engines only assemble what an exporter needs; encoding rows into
//! spreadsheets, documents or text lives elsewhere.

use std::sync::Arc;

use tabula_core::{Result, RowRecord};

use crate::columns::RenderedColumn;
use crate::loader::PageLoader;

/// Rows to export
#[derive(Clone)]
pub enum ExportSource {
    /// The full filtered buffer held by a client-side view
    Rows(Vec<RowRecord>),
    /// A server-paged result, fetched by the exporter itself
    Loader {
        loader: Arc<dyn PageLoader>,
        total_count: usize,
        page_size: usize,
    },
}

impl std::fmt::Debug for ExportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rows(rows) => f.debug_tuple("Rows").field(&rows.len()).finish(),
            Self::Loader {
                total_count,
                page_size,
                ..
            } => f
                .debug_struct("Loader")
                .field("total_count", total_count)
                .field("page_size", page_size)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Display titles of the visible columns
    pub headers: Vec<String>,
    /// Canonical keys, parallel to `headers`
    pub keys: Vec<String>,
    pub source: ExportSource,
}

impl ExportRequest {
    pub(crate) fn new(columns: &[RenderedColumn], source: ExportSource) -> Self {
        Self {
            headers: columns.iter().map(|c| c.title.clone()).collect(),
            keys: columns.iter().map(|c| c.key.clone()).collect(),
            source,
        }
    }
}

/// Consumes an [`ExportRequest`]
pub trait Exporter {
    fn export(&self, request: ExportRequest) -> Result<()>;
}

impl<F> Exporter for F
where
    F: Fn(ExportRequest) -> Result<()>,
{
    fn export(&self, request: ExportRequest) -> Result<()> {
        self(request)
    }
}
