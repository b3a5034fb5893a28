//! `tabula` - browse a JSON result set in the terminal
//!
//! Loads a JSON array of row objects and drives the flat or grouped grid
//! engine the way an interactive view would: search, paging, column
//! renames and deletions, cleaning, expansion and export.

mod logging;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Table, presets::UTF8_FULL};
use tabula_core::{JsonFileStore, RowRecord};
use tabula_grid::{
    ColumnGrouping, ColumnState, ExportRequest, ExportSource, Exporter, FlatGrid, GridConfig,
    GroupingPathProvider, HierarchicalGrid, MemoryPageLoader, PageLoader, RenderedColumn,
    SingleGroup, VisibleRow, WorkerPool, page_count,
};

use crate::logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "tabula", version, about = "Search, group and page tabular results")]
struct Cli {
    /// Grid configuration file (TOML)
    #[arg(long, global = true, env = "TABULA_CONFIG")]
    config: Option<PathBuf>,

    /// Logging preset
    #[arg(long, global = true, value_enum, default_value_t = LogProfile::Production)]
    log: LogProfile,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogProfile {
    /// Warnings to a JSON file only
    Production,
    /// Verbose console plus JSON file
    Development,
    /// Verbose console, no files
    Console,
}

#[derive(Subcommand)]
enum Command {
    /// Render one page of a JSON result file
    Show(ShowArgs),
    /// Set or remove a persistent column alias
    Alias {
        key: String,
        name: Option<String>,
        #[arg(long)]
        remove: bool,
    },
    /// List persistent column aliases
    Aliases,
    /// Print the effective grid configuration
    Config,
}

#[derive(clap::Args)]
struct ShowArgs {
    /// JSON file holding an array of objects
    file: PathBuf,

    /// Render an ungrouped table
    #[arg(long, conflicts_with_all = ["group_by", "expand", "server"])]
    flat: bool,

    /// Group by these columns, outermost first
    #[arg(long = "group-by", value_delimiter = ',')]
    group_by: Vec<String>,

    /// Serve pages through a background page loader
    #[arg(long)]
    server: bool,

    /// Page to show (1-based)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Rows per page; defaults to the configured value
    #[arg(long)]
    page_size: Option<usize>,

    /// Derive the page size from a viewport height in pixels
    #[arg(long, conflicts_with = "page_size")]
    viewport_height: Option<f32>,

    /// Free-text filter
    #[arg(long)]
    search: Option<String>,

    /// Rename a column for this session (KEY=NAME)
    #[arg(long, value_parser = parse_rename)]
    rename: Vec<(String, String)>,

    /// Delete columns from every page
    #[arg(long = "delete", value_delimiter = ',')]
    delete: Vec<String>,

    /// Delete the columns that are empty on the shown page
    #[arg(long)]
    clean: bool,

    /// Delete the columns that are empty across all pages
    #[arg(long, conflicts_with = "clean")]
    clean_all: bool,

    /// Expand every group
    #[arg(long)]
    expand: bool,

    /// Write the visible columns of the whole result to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn parse_rename(value: &str) -> std::result::Result<(String, String), String> {
    let (key, name) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=NAME, got '{value}'"))?;
    if key.trim().is_empty() || name.trim().is_empty() {
        return Err(format!("key and name must be non-empty in '{value}'"));
    }
    Ok((key.trim().to_string(), name.trim().to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = match cli.log {
        LogProfile::Production => LoggingConfig::production(),
        LogProfile::Development => LoggingConfig::development(),
        LogProfile::Console => LoggingConfig::testing(),
    };
    logging::init(logging)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Show(args) => show(&config, args),
        Command::Alias { key, name, remove } => alias(&config, &key, name.as_deref(), remove),
        Command::Aliases => list_aliases(&config),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<GridConfig> {
    if let Some(path) = explicit {
        return GridConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let default_path = dirs::config_dir().map(|dir| dir.join("tabula").join("grid.toml"));
    match default_path {
        Some(path) if path.exists() => GridConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        _ => Ok(GridConfig::default()),
    }
}

fn alias_store() -> JsonFileStore {
    let dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    JsonFileStore::new(dir.join("tabula").join("aliases.json"))
}

fn load_column_state(config: &GridConfig) -> Result<ColumnState> {
    let state = ColumnState::new();
    state
        .load(&alias_store(), config.alias_namespace())
        .context("failed to load column aliases")?;
    Ok(state)
}

fn alias(config: &GridConfig, key: &str, name: Option<&str>, remove: bool) -> Result<()> {
    let state = load_column_state(config)?;
    if remove {
        if !state.remove_alias(key) {
            bail!("no alias set for '{key}'");
        }
    } else {
        let Some(name) = name else {
            bail!("an alias name is required unless --remove is given");
        };
        if !state.set_alias(key, name, true) {
            bail!("alias name must be non-empty");
        }
    }
    state
        .save(&alias_store(), config.alias_namespace())
        .context("failed to save column aliases")?;
    Ok(())
}

fn list_aliases(config: &GridConfig) -> Result<()> {
    let state = load_column_state(config)?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Column", "Alias"]);
    for (key, name) in state.persistent_aliases() {
        table.add_row(vec![key, name]);
    }
    println!("{table}");
    Ok(())
}

fn read_rows(path: &Path) -> Result<Vec<RowRecord>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let Some(items) = value.as_array() else {
        bail!("{} must hold a JSON array of objects", path.display());
    };
    items
        .iter()
        .map(|item| RowRecord::from_json(item).map_err(Into::into))
        .collect()
}

fn show(config: &GridConfig, args: ShowArgs) -> Result<()> {
    let rows = read_rows(&args.file)?;
    tracing::info!(file = %args.file.display(), rows = rows.len(), "loaded result file");

    let column_state = load_column_state(config)?;
    let page_index = args.page.saturating_sub(1);

    if args.flat {
        show_flat(config, column_state, rows, &args, page_index)
    } else {
        show_tree(config, column_state, rows, &args, page_index)
    }
}

fn show_flat(
    config: &GridConfig,
    column_state: ColumnState,
    rows: Vec<RowRecord>,
    args: &ShowArgs,
    page_index: usize,
) -> Result<()> {
    let mut grid = FlatGrid::new(config.clone(), column_state);
    grid.populate(rows);
    if let Some(rows_per_page) = args.page_size {
        grid.set_rows_per_page(rows_per_page);
    }
    if let Some(height) = args.viewport_height {
        grid.on_viewport_resized(height);
    }
    if let Some(text) = &args.search {
        grid.set_search_text(text);
    }
    for (key, name) in &args.rename {
        if !grid.rename_column(key, name) {
            eprintln!("warning: unknown column '{key}'");
        }
    }
    grid.delete_columns(&args.delete);
    if !grid.go_to_page(page_index) {
        bail!("page {} does not exist ({} pages)", args.page, grid.page_count());
    }
    if args.clean {
        report_cleaned(grid.clean_empty_columns());
    }
    if args.clean_all {
        // Every filtered row is resident in a flat view
        let empty = tabula_grid::empty_column_keys(grid.filtered_rows(), &grid.columns());
        grid.delete_columns(&empty);
        report_cleaned(empty);
    }

    let page = grid.render_page();
    let mut table = new_table(&page.columns, false);
    for cells in page.rows {
        table.add_row(cells);
    }
    println!("{table}");
    println!(
        "page {}/{} | {} matching rows",
        page.page_index + 1,
        page.page_count,
        page.total_count
    );

    if let Some(path) = &args.export {
        grid.export(&JsonExporter::new(path))?;
        println!("exported to {}", path.display());
    }
    Ok(())
}

fn show_tree(
    config: &GridConfig,
    column_state: ColumnState,
    rows: Vec<RowRecord>,
    args: &ShowArgs,
    page_index: usize,
) -> Result<()> {
    let provider: Arc<dyn GroupingPathProvider> = if args.group_by.is_empty() {
        Arc::new(SingleGroup)
    } else {
        Arc::new(ColumnGrouping::new(args.group_by.iter().cloned()))
    };

    let mut grid = if args.server {
        let pool = WorkerPool::shared(config.workers())?;
        let total = rows.len();
        let loader: Arc<dyn PageLoader> = Arc::new(MemoryPageLoader::new(rows));
        let mut grid =
            HierarchicalGrid::server(config.clone(), column_state, pool, loader, total)
                .with_grouping(provider);
        grid.set_search_delegate(Arc::new(|text: &str| {
            tracing::warn!(text, "search requested on a server-paged view; the source does not filter");
        }));
        grid
    } else {
        let mut grid =
            HierarchicalGrid::client(config.clone(), column_state).with_grouping(provider);
        grid.populate(rows);
        grid
    };
    grid.wait_idle();

    if let Some(rows_per_page) = args.page_size {
        grid.set_rows_per_page(rows_per_page);
    }
    if let Some(height) = args.viewport_height {
        grid.on_viewport_resized(height);
    }
    grid.wait_idle();
    if let Some(text) = &args.search {
        grid.set_search_text(text);
    }
    for (key, name) in &args.rename {
        if !grid.rename_column(key, name) {
            eprintln!("warning: unknown column '{key}'");
        }
    }
    grid.delete_columns(&args.delete);

    if !grid.go_to_page(page_index) {
        bail!("page {} does not exist ({} pages)", args.page, grid.page_count());
    }
    grid.wait_idle();
    if grid.page_index() != page_index {
        bail!("page {} could not be loaded", args.page);
    }

    if args.clean {
        report_cleaned(grid.clean_empty_columns());
    }
    if args.clean_all {
        let before = grid.column_state().hidden_keys();
        grid.clean_columns_all_pages();
        grid.wait_idle();
        let removed = grid
            .column_state()
            .hidden_keys()
            .into_iter()
            .filter(|key| !before.contains(key))
            .collect();
        report_cleaned(removed);
    }
    if args.expand {
        grid.expand_all();
        grid.wait_idle();
    }

    let page = grid.render();
    let mut table = new_table(&page.columns, true);
    for row in page.rows {
        match row {
            VisibleRow::Group {
                label,
                depth,
                leaf_count,
                expanded,
                ..
            } => {
                let marker = if expanded { "v" } else { ">" };
                let mut cells = vec![format!(
                    "{}{} {} ({})",
                    "  ".repeat(depth),
                    marker,
                    label,
                    leaf_count
                )];
                cells.resize(page.columns.len() + 1, String::new());
                table.add_row(cells);
            }
            VisibleRow::Leaf { depth, cells, .. } => {
                let mut line = vec!["  ".repeat(depth)];
                line.extend(cells);
                table.add_row(line);
            }
        }
    }
    println!("{table}");
    println!(
        "page {}/{} | {} rows",
        page.page_index + 1,
        page.page_count,
        page.total_count
    );

    if let Some(path) = &args.export {
        grid.export(&JsonExporter::new(path))?;
        println!("exported to {}", path.display());
    }
    Ok(())
}

fn new_table(columns: &[RenderedColumn], with_group_column: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    let mut header: Vec<String> = Vec::with_capacity(columns.len() + 1);
    if with_group_column {
        header.push("Group".to_string());
    }
    header.extend(columns.iter().map(|c| c.title.clone()));
    table.set_header(header);
    table
}

fn report_cleaned(keys: Vec<String>) {
    if keys.is_empty() {
        println!("no empty columns");
    } else {
        println!("removed empty columns: {}", keys.join(", "));
    }
}

/// Writes exported rows as a JSON array keyed by display title
struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn to_object(request: &ExportRequest, row: &RowRecord) -> serde_json::Value {
        let object: serde_json::Map<String, serde_json::Value> = request
            .headers
            .iter()
            .zip(&request.keys)
            .map(|(header, key)| {
                (
                    header.clone(),
                    serde_json::Value::String(row.value_or_empty(key).to_string()),
                )
            })
            .collect();
        serde_json::Value::Object(object)
    }
}

impl Exporter for JsonExporter {
    fn export(&self, request: ExportRequest) -> tabula_core::Result<()> {
        let mut objects = Vec::new();
        match &request.source {
            ExportSource::Rows(rows) => {
                objects.extend(rows.iter().map(|row| Self::to_object(&request, row)));
            }
            ExportSource::Loader {
                loader,
                total_count,
                page_size,
            } => {
                let pages = if *total_count == 0 {
                    0
                } else {
                    page_count(*total_count, *page_size)
                };
                for page in 0..pages {
                    let rows = loader.load_page(page, *page_size)?;
                    objects.extend(rows.iter().map(|row| Self::to_object(&request, row)));
                }
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, &objects)?;
        tracing::info!(path = %self.path.display(), rows = objects.len(), "export written");
        Ok(())
    }
}
