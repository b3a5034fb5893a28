//! Column lifecycle shared by both engines
//!
//! Rendered columns are always derived from three inputs: the headers of the
//! current data, the view's [`ColumnLayout`] and the shared [`ColumnState`].
//! Deleting a column hides its canonical key in the shared state, which is
//! what keeps it off every later page, tree rebuild and sibling engine.

use indexmap::IndexSet;
use tabula_core::RowRecord;

use crate::column_layout::ColumnLayout;
use crate::column_state::ColumnState;

/// A column as it is rendered: canonical key plus display title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedColumn {
    pub key: String,
    pub title: String,
}

/// Header keys of a row, in row order
pub fn headers_of(row: &RowRecord) -> Vec<String> {
    row.keys().map(str::to_string).collect()
}

/// Visible columns for `headers`, in layout order, never containing a hidden key
pub fn visible_columns(
    headers: &[String],
    layout: &ColumnLayout,
    state: &ColumnState,
) -> Vec<RenderedColumn> {
    let present: IndexSet<&str> = headers.iter().map(String::as_str).collect();
    layout
        .visible_entries()
        .into_iter()
        .filter(|entry| present.contains(entry.original_key.as_str()))
        .filter(|entry| !state.is_hidden(&entry.original_key))
        .map(|entry| {
            // An untouched title follows aliases set through sibling views
            let title = if entry.display_name == entry.original_key {
                state.resolve_title(&entry.original_key)
            } else {
                entry.display_name.clone()
            };
            RenderedColumn {
                key: entry.original_key.clone(),
                title,
            }
        })
        .collect()
}

/// Cell strings of `row` for `columns`; missing cells render empty
pub fn format_cells(row: &RowRecord, columns: &[RenderedColumn]) -> Vec<String> {
    columns
        .iter()
        .map(|column| row.value_or_empty(&column.key).to_string())
        .collect()
}

/// Keys of the columns whose value is blank in every row.
///
/// With no rows there is no evidence, so nothing is reported.
pub fn empty_column_keys<'a>(
    rows: impl IntoIterator<Item = &'a RowRecord>,
    columns: &[RenderedColumn],
) -> Vec<String> {
    let mut candidates: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();
    let mut saw_row = false;

    for row in rows {
        saw_row = true;
        candidates.retain(|key| row.is_blank(key));
        if candidates.is_empty() {
            break;
        }
    }

    if !saw_row {
        return Vec::new();
    }
    candidates.into_iter().map(str::to_string).collect()
}

/// Rename a column in the view and register a session alias so sibling
/// views sharing the state pick up the same title
pub fn rename(layout: &mut ColumnLayout, state: &ColumnState, key: &str, new_name: &str) -> bool {
    if !layout.rename_column(key, new_name) {
        return false;
    }
    state.set_alias(key, new_name, false);
    true
}

/// Hide `keys` globally. Returns how many keys were newly hidden.
pub fn delete(state: &ColumnState, keys: &[String]) -> usize {
    let added = state.add_hidden_keys(keys);
    tracing::info!(requested = keys.len(), added, "columns deleted");
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cols(keys: &[&str]) -> Vec<RenderedColumn> {
        keys.iter()
            .map(|k| RenderedColumn {
                key: k.to_string(),
                title: k.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_visible_columns_skip_hidden_and_absent_keys() {
        let state = ColumnState::new();
        let mut layout = ColumnLayout::delegating("v", state.clone());
        layout.apply_default_from_headers(["a", "b", "c", "d"]);
        state.add_hidden_key("b");

        let headers = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let keys: Vec<String> = visible_columns(&headers, &layout, &state)
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_column_detection() {
        let rows = vec![
            RowRecord::new().with("a", "1").with("b", "").with("c", " "),
            RowRecord::new().with("a", "").with("b", "").with("c", "x"),
        ];
        assert_eq!(
            empty_column_keys(&rows, &cols(&["a", "b", "c", "missing"])),
            vec!["b", "missing"]
        );
        assert!(empty_column_keys(&Vec::new(), &cols(&["a"])).is_empty());
    }

    #[test]
    fn test_rename_registers_session_alias() {
        let state = ColumnState::new();
        let mut layout = ColumnLayout::delegating("v", state.clone());
        layout.apply_default_from_headers(["a"]);
        assert!(rename(&mut layout, &state, "a", "Alpha"));
        assert_eq!(state.resolve_title("a"), "Alpha");
        assert!(!rename(&mut layout, &state, "zz", "Nope"));
        assert!(!state.has_alias("zz"));
    }
}
