//! Integration tests for FlatGrid
//!
//! Covers client paging, free-text search, column derivation and the column
//! lifecycle as seen through the flat engine.

mod common;

use pretty_assertions::assert_eq;
use tabula_core::{Result, RowRecord};
use tabula_grid::{ColumnState, ExportRequest, ExportSource, FlatGrid, GridConfig, GridEvent};

use common::{event_sink, sample_rows};

fn grid(rows: Vec<RowRecord>, rows_per_page: usize) -> FlatGrid {
    let mut grid = FlatGrid::new(GridConfig::new(rows_per_page), ColumnState::new());
    grid.populate(rows);
    grid
}

fn ids(grid: &FlatGrid) -> Vec<String> {
    grid.page_rows()
        .iter()
        .map(|row| row.value_or_empty("id").to_string())
        .collect()
}

// ============ Paging Tests ============

#[test]
fn pages_concatenate_to_the_filtered_rows() {
    for n in 0..40 {
        for k in 1..9 {
            let mut grid = grid(sample_rows(n), k);
            let expected_pages = if n == 0 { 1 } else { n.div_ceil(k) };
            assert_eq!(grid.page_count(), expected_pages, "n={} k={}", n, k);

            let mut seen = Vec::new();
            for page in 0..grid.page_count() {
                assert!(grid.go_to_page(page));
                seen.extend(ids(&grid));
            }
            let all: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            assert_eq!(seen, all, "n={} k={}", n, k);
        }
    }
}

#[test]
fn out_of_range_page_is_rejected() {
    let mut grid = grid(sample_rows(25), 10);
    assert!(!grid.go_to_page(3));
    assert_eq!(grid.page_index(), 0);
    assert!(grid.last_page());
    assert_eq!(ids(&grid).len(), 5);
    assert!(!grid.next_page());
    assert!(grid.prev_page());
    assert_eq!(grid.page_index(), 1);
}

#[test]
fn page_size_change_keeps_or_clamps_the_page() {
    let mut grid = grid(sample_rows(100), 10);
    assert!(grid.go_to_page(3));
    assert!(grid.set_rows_per_page(20));
    assert_eq!(grid.page_index(), 3);
    assert!(grid.set_rows_per_page(50));
    assert_eq!(grid.page_index(), 1);
    assert!(!grid.set_rows_per_page(0));
}

#[test]
fn viewport_resize_respects_hysteresis() {
    let config = GridConfig::new(20).with_row_height(10.0);
    let mut grid = FlatGrid::new(config, ColumnState::new());
    grid.populate(sample_rows(100));

    // 205px -> 20 rows, 215px -> 21 rows: inside the one-row band
    assert!(!grid.on_viewport_resized(205.0));
    assert!(!grid.on_viewport_resized(215.0));
    assert_eq!(grid.rows_per_page(), 20);

    // 225px -> 22 rows: outside the band
    assert!(grid.on_viewport_resized(225.0));
    assert_eq!(grid.rows_per_page(), 22);
}

// ============ Search Tests ============

#[test]
fn search_returns_rows_containing_the_text_in_any_cell() {
    let mut grid = grid(sample_rows(30), 100);
    grid.set_search_text("customer 1");
    let found = ids(&grid);
    let expected: Vec<String> = (0..30)
        .filter(|i| format!("customer {}", i).contains("customer 1"))
        .map(|i| i.to_string())
        .collect();
    assert_eq!(found, expected);

    grid.set_search_text("NORTH");
    assert_eq!(grid.filtered_count(), 10);

    grid.set_search_text("");
    assert_eq!(grid.filtered_count(), 30);
}

#[test]
fn search_emits_match_count_and_resets_page() {
    let mut grid = grid(sample_rows(30), 5);
    let (events, sink) = event_sink();
    grid.subscribe(sink);
    assert!(grid.go_to_page(4));

    grid.set_search_text("south");
    assert_eq!(grid.page_index(), 0);
    assert!(events.lock().contains(&GridEvent::SearchChanged {
        text: "south".into(),
        matches: Some(20),
    }));
}

// ============ Column Tests ============

#[test]
fn columns_come_from_the_first_filtered_row() {
    let rows = vec![
        RowRecord::new().with("a", "x").with("b", "1"),
        RowRecord::new().with("c", "y").with("d", "2"),
    ];
    let mut grid = grid(rows, 10);
    let keys = |g: &FlatGrid| -> Vec<String> { g.columns().into_iter().map(|c| c.key).collect() };
    assert_eq!(keys(&grid), vec!["a", "b"]);

    grid.set_search_text("y");
    assert_eq!(keys(&grid), vec!["c", "d"]);

    // No match: the previous columns stay
    grid.set_search_text("zzz");
    assert_eq!(keys(&grid), vec!["c", "d"]);
}

#[test]
fn deleted_column_stays_hidden_on_every_page() {
    let mut grid = grid(sample_rows(50), 10);
    assert!(grid.delete_column("comment"));
    for page in 0..grid.page_count() {
        grid.go_to_page(page);
        let page = grid.render_page();
        assert!(page.columns.iter().all(|c| c.key != "comment"));
        assert!(page.rows.iter().all(|cells| cells.len() == 3));
    }

    grid.populate(sample_rows(10));
    assert!(grid.columns().iter().all(|c| c.key != "comment"));
}

#[test]
fn clean_is_idempotent_until_data_changes() {
    let mut grid = grid(sample_rows(20), 10);
    assert_eq!(grid.clean_empty_columns(), vec!["comment"]);
    assert!(grid.clean_empty_columns().is_empty());

    grid.reset_columns();
    assert!(!grid.column_state().has_hidden());
    assert_eq!(grid.clean_empty_columns(), vec!["comment"]);
}

#[test]
fn clean_scans_only_the_current_page() {
    let rows = common::rows_with_single_comment(20, 15);
    let mut grid = grid(rows, 10);
    assert_eq!(grid.clean_empty_columns(), vec!["comment"]);

    let mut grid = self::grid(common::rows_with_single_comment(20, 5), 10);
    assert!(grid.clean_empty_columns().is_empty());
}

#[test]
fn rename_changes_title_only() {
    let mut grid = grid(sample_rows(5), 10);
    assert!(grid.rename_column("name", "Customer"));
    assert!(!grid.rename_column("name", "   "));
    assert!(!grid.rename_column("missing", "Nope"));

    let columns = grid.columns();
    let name = columns.iter().find(|c| c.key == "name").unwrap();
    assert_eq!(name.title, "Customer");

    grid.set_search_text("Customer 3");
    assert_eq!(grid.filtered_count(), 1);
}

// ============ Export Tests ============

#[test]
fn export_receives_visible_headers_and_filtered_rows() {
    let mut grid = grid(sample_rows(12), 5);
    grid.rename_column("name", "Customer");
    grid.delete_column("comment");
    grid.set_search_text("north");

    let captured = parking_lot::Mutex::new(None);
    let exporter = |request: ExportRequest| -> Result<()> {
        *captured.lock() = Some(request);
        Ok(())
    };
    grid.export(&exporter).unwrap();

    let request = captured.lock().take().unwrap();
    assert_eq!(request.headers, vec!["id", "Customer", "region"]);
    assert_eq!(request.keys, vec!["id", "name", "region"]);
    match request.source {
        ExportSource::Rows(rows) => assert_eq!(rows.len(), 4),
        other => panic!("unexpected source: {:?}", other),
    }
}
