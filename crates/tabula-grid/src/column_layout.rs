//! View-specific column projection
//!
//! A [`ColumnLayout`] is an ordered, named list of [`ColumnEntry`] values.
//! `order_index` values are kept contiguous (`0..N-1`) after every mutation.
//! When built with [`ColumnLayout::delegating`], hiding a column is mirrored
//! into the shared [`ColumnState`], and globally hidden keys are never
//! reported as visible.

use indexmap::IndexSet;

use crate::column_state::ColumnState;

/// One column of a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    /// Canonical key, never renamed
    pub original_key: String,
    /// Title shown to the user, defaults to the key
    pub display_name: String,
    pub visible: bool,
    pub order_index: usize,
}

impl ColumnEntry {
    fn new(key: impl Into<String>, display_name: impl Into<String>, order_index: usize) -> Self {
        Self {
            original_key: key.into(),
            display_name: display_name.into(),
            visible: true,
            order_index,
        }
    }
}

/// Ordered column projection for one view
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    name: String,
    /// Kept sorted by `order_index`
    entries: Vec<ColumnEntry>,
    delegate: Option<ColumnState>,
}

impl ColumnLayout {
    /// Create a standalone layout
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            delegate: None,
        }
    }

    /// Create a layout whose hidden notion is backed by `state`
    pub fn delegating(name: impl Into<String>, state: ColumnState) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            delegate: Some(state),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_delegating(&self) -> bool {
        self.delegate.is_some()
    }

    /// Reset to one visible entry per header, in header order.
    ///
    /// Duplicate headers keep their first occurrence. With delegation the
    /// shared hidden set is cleared as well.
    pub fn apply_default_from_headers<I, S>(&mut self, headers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: IndexSet<String> = headers
            .into_iter()
            .map(|h| h.as_ref().to_string())
            .collect();

        let entries: Vec<ColumnEntry> = keys
            .into_iter()
            .enumerate()
            .map(|(ix, key)| {
                let title = self.default_title(&key);
                ColumnEntry::new(key, title, ix)
            })
            .collect();
        self.entries = entries;

        if let Some(state) = &self.delegate {
            state.replace_hidden_keys(Vec::<String>::new());
        }

        tracing::debug!(layout = %self.name, columns = self.entries.len(), "layout reset from headers");
    }

    /// Append entries for headers the layout has not seen yet.
    ///
    /// Existing entries keep their names, visibility and order. Returns the
    /// number of entries added.
    pub fn merge_headers<I, S>(&mut self, headers: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for header in headers {
            let key = header.as_ref();
            if self.position(key).is_some() {
                continue;
            }
            let title = self.default_title(key);
            let order_index = self.entries.len();
            self.entries.push(ColumnEntry::new(key, title, order_index));
            added += 1;
        }
        added
    }

    fn default_title(&self, key: &str) -> String {
        match &self.delegate {
            Some(state) => state.resolve_title(key),
            None => key.to_string(),
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.original_key == key)
    }

    /// Rename a column. Returns false if the key is unknown or the name is blank.
    pub fn rename_column(&mut self, key: &str, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            tracing::warn!(layout = %self.name, key, "rename rejected: new name must be non-empty");
            return false;
        }
        let Some(ix) = self.position(key) else {
            tracing::warn!(layout = %self.name, key, "rename rejected: unknown column");
            return false;
        };
        self.entries[ix].display_name = new_name.to_string();
        true
    }

    /// Show or hide a column. Idempotent; returns false if the key is unknown.
    pub fn set_column_visibility(&mut self, key: &str, visible: bool) -> bool {
        let Some(ix) = self.position(key) else {
            tracing::warn!(layout = %self.name, key, "visibility change rejected: unknown column");
            return false;
        };
        self.entries[ix].visible = visible;

        if let Some(state) = &self.delegate {
            if visible {
                state.remove_hidden_key(key);
            } else {
                state.add_hidden_key(key);
            }
        }
        true
    }

    /// Move a column to `new_index` (clamped to the last position) and
    /// renumber every entry. Returns false if the key is unknown.
    pub fn move_column(&mut self, key: &str, new_index: usize) -> bool {
        let Some(ix) = self.position(key) else {
            tracing::warn!(layout = %self.name, key, "move rejected: unknown column");
            return false;
        };
        let entry = self.entries.remove(ix);
        let target = new_index.min(self.entries.len());
        self.entries.insert(target, entry);
        self.renumber();
        true
    }

    /// Drop an entry entirely, renumbering the rest
    pub fn remove_column(&mut self, key: &str) -> bool {
        let Some(ix) = self.position(key) else {
            return false;
        };
        self.entries.remove(ix);
        self.renumber();
        true
    }

    fn renumber(&mut self) {
        for (ix, entry) in self.entries.iter_mut().enumerate() {
            entry.order_index = ix;
        }
    }

    fn is_effectively_visible(&self, entry: &ColumnEntry) -> bool {
        entry.visible
            && self
                .delegate
                .as_ref()
                .is_none_or(|state| !state.is_hidden(&entry.original_key))
    }

    /// Visible entries sorted by `order_index`
    pub fn visible_entries(&self) -> Vec<&ColumnEntry> {
        self.entries
            .iter()
            .filter(|e| self.is_effectively_visible(e))
            .collect()
    }

    /// All entries sorted by `order_index`
    pub fn entries(&self) -> &[ColumnEntry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&ColumnEntry> {
        self.position(key).map(|ix| &self.entries[ix])
    }

    pub fn show_all(&mut self) {
        let keys: Vec<String> = self.entries.iter().map(|e| e.original_key.clone()).collect();
        for entry in &mut self.entries {
            entry.visible = true;
        }
        if let Some(state) = &self.delegate {
            let remaining: Vec<String> = state
                .hidden_keys()
                .into_iter()
                .filter(|k| !keys.contains(k))
                .collect();
            state.replace_hidden_keys(remaining);
        }
    }

    pub fn hide_all(&mut self) {
        for entry in &mut self.entries {
            entry.visible = false;
        }
        if let Some(state) = &self.delegate {
            state.add_hidden_keys(self.entries.iter().map(|e| e.original_key.as_str()));
        }
    }

    pub fn visible_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| self.is_effectively_visible(e))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
