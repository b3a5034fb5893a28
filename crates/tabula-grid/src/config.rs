//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use tabula_core::{Result, TabulaError};

/// Configuration shared by the flat and hierarchical engines
///
/// Controls paging defaults, the background worker pool size and the
/// viewport-driven page sizing behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Rows per page until the viewport or the user picks another size
    rows_per_page: usize,
    /// Number of background workers used for page loads and prefetches
    workers: usize,
    /// A recomputed page size is only applied when it differs from the last
    /// applied size by more than this many rows
    resize_hysteresis: usize,
    /// Height of one rendered row in pixels
    row_height: f32,
    /// Group label used when the grouping provider yields no path
    default_group_label: String,
    /// Key prefix under which persistent column aliases are stored
    alias_namespace: String,
    /// Page sizes offered to the user
    available_page_sizes: Vec<usize>,
}

impl GridConfig {
    /// Create a configuration with the given default rows per page
    ///
    /// # Panics
    ///
    /// Panics if `rows_per_page` is 0.
    pub fn new(rows_per_page: usize) -> Self {
        assert!(
            rows_per_page > 0,
            "rows_per_page must be greater than 0, got {}",
            rows_per_page
        );

        Self {
            rows_per_page,
            ..Self::default()
        }
    }

    /// Parse a TOML document. Missing keys fall back to the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| TabulaError::Configuration(format!("invalid grid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded grid config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rows_per_page == 0 {
            return Err(TabulaError::Configuration(
                "rows_per_page must be greater than 0".into(),
            ));
        }
        if self.workers == 0 {
            return Err(TabulaError::Configuration(
                "workers must be greater than 0".into(),
            ));
        }
        if self.row_height.is_nan() || self.row_height <= 0.0 {
            return Err(TabulaError::Configuration(format!(
                "row_height must be positive, got {}",
                self.row_height
            )));
        }
        if self.available_page_sizes.contains(&0) {
            return Err(TabulaError::Configuration(
                "available_page_sizes must not contain 0".into(),
            ));
        }
        Ok(())
    }

    /// Set the number of background workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the resize hysteresis band in rows
    pub fn with_resize_hysteresis(mut self, rows: usize) -> Self {
        self.resize_hysteresis = rows;
        self
    }

    /// Set the rendered row height in pixels
    pub fn with_row_height(mut self, row_height: f32) -> Self {
        if row_height > 0.0 {
            self.row_height = row_height;
        }
        self
    }

    /// Set the catch-all group label
    pub fn with_default_group_label(mut self, label: impl Into<String>) -> Self {
        self.default_group_label = label.into();
        self
    }

    /// Set the alias persistence namespace
    pub fn with_alias_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.alias_namespace = namespace.into();
        self
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn resize_hysteresis(&self) -> usize {
        self.resize_hysteresis
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn default_group_label(&self) -> &str {
        &self.default_group_label
    }

    pub fn alias_namespace(&self) -> &str {
        &self.alias_namespace
    }

    pub fn available_page_sizes(&self) -> &[usize] {
        &self.available_page_sizes
    }
}

impl Default for GridConfig {
    /// Defaults:
    /// - rows_per_page: 100
    /// - workers: 4
    /// - resize_hysteresis: 1 row
    /// - row_height: 24px
    /// - default_group_label: "All"
    /// - alias_namespace: "column_aliases"
    fn default() -> Self {
        Self {
            rows_per_page: 100,
            workers: 4,
            resize_hysteresis: 1,
            row_height: 24.0,
            default_group_label: "All".to_string(),
            alias_namespace: "column_aliases".to_string(),
            available_page_sizes: vec![100, 500, 1000, 5000, 10000],
        }
    }
}
