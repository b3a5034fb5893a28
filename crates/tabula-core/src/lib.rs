//! Tabula Core - Shared types and infrastructure for the result grid engine
//!
//! This crate provides the fundamental building blocks that the grid engine
//! and its front-ends depend on. It defines:
//!
//! - `RowRecord` - One result row as an ordered column key -> string mapping
//! - `TabulaError` - The crate-wide error type and `Result` alias
//! - `KeyValueStore` - Flat key/value persistence used for column aliases
//! - `EventEmitter` - Typed publish/subscribe primitive used by shared state

mod error;
mod events;
mod store;
mod types;

pub use error::*;
pub use events::*;
pub use store::*;
pub use types::*;
