//! Result grid engine for Tabula
//!
//! Turns flat row records into searchable, paginated and optionally grouped
//! grids. Two engines share the same column machinery:
//!
//! - [`FlatGrid`]: a plain table over rows held in memory.
//! - [`HierarchicalGrid`]: a grouped tree, paged in memory or through a
//!   [`PageLoader`] running on a bounded [`WorkerPool`].
//!
//! Engines that show the same result share a [`ColumnState`] (globally
//! hidden columns and aliases) and possibly a [`ResultContext`].

mod column_layout;
mod column_state;
mod columns;
mod config;
mod events;
mod export;
mod flat_grid;
mod loader;
mod pagination;
mod result_context;
mod table_state;
mod tree;
mod tree_grid;
mod worker;

pub use column_layout::*;
pub use column_state::*;
pub use columns::{RenderedColumn, empty_column_keys, visible_columns};
pub use config::*;
pub use events::*;
pub use export::*;
pub use flat_grid::*;
pub use loader::*;
pub use pagination::*;
pub use result_context::*;
pub use table_state::*;
pub use tree::*;
pub use tree_grid::*;
pub use worker::*;
