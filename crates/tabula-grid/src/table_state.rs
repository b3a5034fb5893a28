//! Transient per-view UI state

use std::collections::HashMap;

/// Search, paging and expansion state owned by one engine instance
#[derive(Debug, Clone)]
pub struct TableState {
    search_text: String,
    search_active: bool,
    /// Total rows behind the view: filtered count in client mode, the
    /// caller-supplied count in server mode
    total_count: usize,
    /// Current page (0-indexed)
    page_index: usize,
    rows_per_page: usize,
    /// Expansion flags keyed by group node key
    expanded: HashMap<String, bool>,
    /// Set once "clean empty columns" ran against the current data
    clean_applied: bool,
}

impl TableState {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            search_text: String::new(),
            search_active: false,
            total_count: 0,
            page_index: 0,
            rows_per_page: rows_per_page.max(1),
            expanded: HashMap::new(),
            clean_applied: false,
        }
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    /// Store the search text; search is active whenever the trimmed text is non-empty
    pub fn set_search_text(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.search_active = !text.trim().is_empty();
    }

    /// Lowercased needle used for case-insensitive matching, empty when inactive
    pub fn search_needle(&self) -> String {
        if self.search_active {
            self.search_text.to_lowercase()
        } else {
            String::new()
        }
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn set_total_count(&mut self, total: usize) {
        self.total_count = total;
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        self.rows_per_page = rows_per_page.max(1);
    }

    /// Number of pages for the current total, never less than 1
    pub fn page_count(&self) -> usize {
        crate::pagination::page_count(self.total_count, self.rows_per_page)
    }

    pub fn is_expanded(&self, node_key: &str) -> bool {
        self.expanded.get(node_key).copied().unwrap_or(false)
    }

    pub fn set_expanded(&mut self, node_key: &str, expanded: bool) {
        self.expanded.insert(node_key.to_string(), expanded);
    }

    /// Flip a node's flag and return the new value
    pub fn toggle_expanded(&mut self, node_key: &str) -> bool {
        let flag = self.expanded.entry(node_key.to_string()).or_insert(false);
        *flag = !*flag;
        *flag
    }

    pub fn clear_expansion(&mut self) {
        self.expanded.clear();
    }

    pub fn is_clean_applied(&self) -> bool {
        self.clean_applied
    }

    pub fn set_clean_applied(&mut self) {
        self.clean_applied = true;
    }

    /// New data arrived: cleaning may find something again
    pub fn mark_data_changed(&mut self) {
        self.clean_applied = false;
    }
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_activity_follows_text() {
        let mut state = TableState::default();
        state.set_search_text("  ");
        assert!(!state.is_search_active());
        assert_eq!(state.search_needle(), "");
        state.set_search_text("ABC");
        assert!(state.is_search_active());
        assert_eq!(state.search_needle(), "abc");
    }

    #[test]
    fn test_page_count_is_at_least_one() {
        let mut state = TableState::new(10);
        assert_eq!(state.page_count(), 1);
        state.set_total_count(21);
        assert_eq!(state.page_count(), 3);
    }

    #[test]
    fn test_clean_flag_resets_on_data_change() {
        let mut state = TableState::default();
        state.set_clean_applied();
        assert!(state.is_clean_applied());
        state.mark_data_changed();
        assert!(!state.is_clean_applied());
    }

    #[test]
    fn test_toggle_expansion() {
        let mut state = TableState::default();
        assert!(!state.is_expanded("g"));
        assert!(state.toggle_expanded("g"));
        assert!(!state.toggle_expanded("g"));
        state.set_expanded("g", true);
        state.clear_expansion();
        assert!(!state.is_expanded("g"));
    }
}
