//! Integration tests for the column registry and layouts
//!
//! Order-index contiguity, global hiding, alias resolution and persistence
//! through the file-backed store.

mod common;

use pretty_assertions::assert_eq;
use tabula_core::{JsonFileStore, KeyValueStore, MemoryStore};
use tabula_grid::{ColumnLayout, ColumnState, ColumnStateEvent, FlatGrid, GridConfig};

use common::sample_rows;

fn assert_contiguous(layout: &ColumnLayout) {
    let mut indices: Vec<usize> = layout.entries().iter().map(|e| e.order_index).collect();
    indices.sort_unstable();
    let expected: Vec<usize> = (0..layout.total_count()).collect();
    assert_eq!(indices, expected);
}

// ============ Layout Tests ============

#[test]
fn order_indices_stay_contiguous_under_mixed_operations() {
    let state = ColumnState::new();
    let mut layout = ColumnLayout::delegating("orders", state.clone());
    layout.apply_default_from_headers(["id", "customer", "total", "status", "notes", "created"]);

    // Deterministic pseudo-random walk over keys and targets
    let keys = ["id", "customer", "total", "status", "notes", "created", "ghost"];
    let mut seed: usize = 17;
    for step in 0..300 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) % 2_147_483_648;
        let key = keys[seed % keys.len()];
        match step % 5 {
            0 => {
                layout.move_column(key, seed % 9);
            }
            1 => {
                layout.rename_column(key, &format!("{} #{}", key, step));
            }
            2 => {
                layout.set_column_visibility(key, false);
            }
            3 => {
                layout.set_column_visibility(key, true);
            }
            _ => {
                layout.merge_headers([format!("extra_{}", step % 3)]);
            }
        }
        assert_contiguous(&layout);
    }
}

#[test]
fn unknown_keys_leave_the_layout_untouched() {
    let mut layout = ColumnLayout::new("v");
    layout.apply_default_from_headers(["a", "b"]);
    let before = layout.entries().to_vec();

    assert!(!layout.rename_column("zz", "Z"));
    assert!(!layout.set_column_visibility("zz", false));
    assert!(!layout.move_column("zz", 0));
    assert_eq!(layout.entries(), before.as_slice());
}

#[test]
fn hiding_through_a_delegating_layout_is_global() {
    let state = ColumnState::new();
    let mut first = ColumnLayout::delegating("first", state.clone());
    let mut second = ColumnLayout::delegating("second", state.clone());
    first.apply_default_from_headers(["a", "b", "c"]);
    second.merge_headers(["a", "b", "c"]);

    assert!(first.set_column_visibility("b", false));
    let visible: Vec<&str> = second
        .visible_entries()
        .into_iter()
        .map(|e| e.original_key.as_str())
        .collect();
    assert_eq!(visible, vec!["a", "c"]);
    assert!(state.has_hidden());
}

// ============ Hidden Set Tests ============

#[test]
fn hidden_keys_survive_new_data_until_reset() {
    let state = ColumnState::new();
    let mut grid = FlatGrid::new(GridConfig::new(10), state.clone());
    grid.populate(sample_rows(20));
    grid.delete_columns(&["comment".to_string(), "region".to_string()]);

    grid.populate(sample_rows(5));
    grid.set_search_text("customer");
    let keys: Vec<String> = grid.columns().into_iter().map(|c| c.key).collect();
    assert_eq!(keys, vec!["id", "name"]);

    grid.reset_columns();
    assert!(!state.has_hidden());
    assert_eq!(grid.columns().len(), 4);
}

#[test]
fn bulk_delete_notifies_once() {
    let state = ColumnState::new();
    let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    state.subscribe(move |event| sink.lock().push(event.clone()));

    let mut grid = FlatGrid::new(GridConfig::new(10), state.clone());
    grid.populate(sample_rows(3));
    assert_eq!(
        grid.delete_columns(&["comment".to_string(), "region".to_string()]),
        2
    );
    assert_eq!(grid.delete_columns(&["comment".to_string()]), 0);

    assert_eq!(
        *seen.lock(),
        vec![ColumnStateEvent::HiddenKeysChanged { has_hidden: true }]
    );
}

// ============ Alias Tests ============

#[test]
fn alias_resolution_prefers_session_names() {
    let state = ColumnState::new();
    assert!(state.set_alias("qty", "Quantity", true));
    assert_eq!(state.resolve_title("qty"), "Quantity");
    assert!(state.set_alias("qty", "Qty (session)", false));
    assert_eq!(state.resolve_title("qty"), "Qty (session)");

    state.clear();
    assert_eq!(state.resolve_title("qty"), "Quantity");
    assert!(state.remove_alias("qty"));
    assert_eq!(state.resolve_title("qty"), "qty");
}

#[test]
fn only_persistent_aliases_are_saved() {
    let store = MemoryStore::new();
    let state = ColumnState::new();
    state.set_alias("qty", "Quantity", true);
    state.set_alias("sku", "Article", false);
    state.add_hidden_key("notes");
    state.save(&store, "column_aliases").unwrap();

    assert_eq!(
        store.keys_with_prefix("column_aliases/").unwrap(),
        vec!["column_aliases/qty".to_string()]
    );

    let restored = ColumnState::new();
    restored.load(&store, "column_aliases").unwrap();
    assert_eq!(restored.resolve_title("qty"), "Quantity");
    assert_eq!(restored.resolve_title("sku"), "sku");
    assert!(!restored.has_hidden());
}

#[test]
fn aliases_round_trip_through_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("aliases.json");

    let state = ColumnState::new();
    state.set_alias("qty", "Quantity", true);
    state.set_alias("price", "Unit price", true);
    state.save(&JsonFileStore::new(&path), "column_aliases").unwrap();

    state.remove_alias("price");
    state.save(&JsonFileStore::new(&path), "column_aliases").unwrap();

    let restored = ColumnState::new();
    restored.load(&JsonFileStore::new(&path), "column_aliases").unwrap();
    assert_eq!(restored.persistent_aliases().len(), 1);
    assert_eq!(restored.resolve_title("qty"), "Quantity");
    assert_eq!(restored.resolve_title("price"), "price");
}
