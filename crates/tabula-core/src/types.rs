//! Core types for Tabula

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Result, TabulaError};

/// A single result row: an ordered mapping from column key to display string.
///
/// Key order is the order in which the query layer produced the columns and is
/// what the flat engine uses to derive its headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowRecord {
    cells: IndexMap<String, String>,
}

impl RowRecord {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, convenient in fixtures
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a cell, keeping the original position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(key.into(), value.into());
    }

    /// Get a cell value by column key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells.get(key).map(String::as_str)
    }

    /// Cell value, or the empty string when the row has no such column
    pub fn value_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.cells.contains_key(key)
    }

    /// Column keys in row order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.values().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether any cell contains `needle_lower`, compared case-insensitively.
    ///
    /// `needle_lower` must already be lowercased; an empty needle matches every row.
    pub fn contains_text(&self, needle_lower: &str) -> bool {
        if needle_lower.is_empty() {
            return true;
        }
        self.cells
            .values()
            .any(|value| value.to_lowercase().contains(needle_lower))
    }

    /// Whether the cell for `key` is missing, empty or whitespace only
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).is_none_or(|v| v.trim().is_empty())
    }

    /// Build a row from a JSON object.
    ///
    /// Strings are taken verbatim, `null` becomes the empty string and every
    /// other value uses its JSON text.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            TabulaError::InvalidArgument(format!("expected a JSON object per row, got {}", value))
        })?;

        Ok(object
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect())
    }
}

impl<K, V> FromIterator<(K, V)> for RowRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_preserve_insertion_order() {
        let row = RowRecord::new()
            .with("zeta", "1")
            .with("alpha", "2")
            .with("mid", "3");
        let keys: Vec<&str> = row.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_contains_text_is_case_insensitive() {
        let row = RowRecord::new().with("name", "Alice Smith").with("city", "Oslo");
        assert!(row.contains_text("smith"));
        assert!(row.contains_text("osl"));
        assert!(!row.contains_text("bergen"));
        assert!(row.contains_text(""));
    }

    #[test]
    fn test_is_blank() {
        let row = RowRecord::new().with("a", "  ").with("b", "x");
        assert!(row.is_blank("a"));
        assert!(!row.is_blank("b"));
        assert!(row.is_blank("missing"));
    }

    #[test]
    fn test_from_json_stringifies_scalars() {
        let value = serde_json::json!({"id": 7, "name": "Bob", "note": null, "ok": true});
        let row = RowRecord::from_json(&value).unwrap();
        assert_eq!(row.get("id"), Some("7"));
        assert_eq!(row.get("name"), Some("Bob"));
        assert_eq!(row.get("note"), Some(""));
        assert_eq!(row.get("ok"), Some("true"));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = RowRecord::from_json(&serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, TabulaError::InvalidArgument(_)));
    }
}
