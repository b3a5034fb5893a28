//! Error types for Tabula

use thiserror::Error;

/// Core error type for Tabula operations
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("Page load error: {0}")]
    PageLoad(String),

    #[error("Grouping error: {0}")]
    Grouping(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl TabulaError {
    /// Shorthand for a page loader failure with a displayable cause
    pub fn page_load(message: impl std::fmt::Display) -> Self {
        Self::PageLoad(message.to_string())
    }
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;
