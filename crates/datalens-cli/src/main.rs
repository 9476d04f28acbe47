//! DataLens CLI
//!
//! Command-line tool for viewing, filtering and exporting the threads /
//! non-threads CSV datasets.

mod config;

use clap::{Args, Parser, Subcommand};
use config::{resolve_config, Config, ConfigError, PartialConfig};
use datalens_core::{
    discover_datasets, parse_csv_report, upload_file, Classification, CombinedRow, Dashboard,
    DatasetKind, DirectoryStore, DocumentStore, ScoreThreshold, DEFAULT_EXPORT_FILE,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "datalens")]
#[command(about = "DataLens CSV dashboard", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a datalens.json config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rows per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Directory holding the document store
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Anomaly score threshold for highlighting
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Print detailed error diagnostics
    #[arg(long, global = true, action = clap::ArgAction::SetTrue)]
    dev: bool,

    /// Enable debug logging
    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where to load the two datasets from
#[derive(Args, Debug, Clone, Default)]
struct DataArgs {
    /// Threads CSV file
    #[arg(long)]
    threads: Option<PathBuf>,

    /// Non-threads CSV file
    #[arg(long)]
    non_threads: Option<PathBuf>,

    /// Directory to search for threads.csv / nonthreads.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Load both datasets from the document store
    #[arg(long, action = clap::ArgAction::SetTrue)]
    from_store: bool,
}

/// Filter and sort options
#[derive(Args, Debug, Clone, Default)]
struct ViewArgs {
    /// Case-insensitive text to match in any column
    #[arg(short, long)]
    filter: Option<String>,

    /// Column filter as column=pattern (repeatable)
    #[arg(short = 'w', long = "where")]
    column_filters: Vec<String>,

    /// Sort by a column; repeating the same column flips the direction
    #[arg(short, long)]
    sort: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and display a single CSV file
    Parse {
        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show one page of the combined table
    Show {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Page to show (1-indexed)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Columns to display (comma-separated)
        #[arg(short, long)]
        columns: Option<String>,

        /// Mark anomalous rows using the score threshold
        #[arg(long, action = clap::ArgAction::SetTrue)]
        highlight: bool,
    },

    /// Export the filtered and sorted rows
    Export {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output file path
        #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
        output: PathBuf,
    },

    /// Show chart aggregates
    Stats {
        #[command(flatten)]
        data: DataArgs,

        /// Print as JSON
        #[arg(long, action = clap::ArgAction::SetTrue)]
        json: bool,
    },

    /// Store a CSV file in the document store
    Upload {
        /// Dataset to replace (threads or non-threads)
        #[arg(short, long)]
        kind: String,

        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print a stored dataset's CSV text
    Fetch {
        /// Dataset to read (threads or non-threads)
        #[arg(short, long)]
        kind: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] datalens_core::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Usage(String),
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Core(e.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Core(e.into())
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, config.dev);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> CliResult<Config> {
    let cwd = std::env::current_dir()?;
    let env: BTreeMap<String, String> = std::env::vars().collect();
    let (config, path) = resolve_config(cli.config.as_deref(), &cwd, &env, cli_overrides(cli))?;

    match &path {
        Some(path) => info!(path = %path.display(), "loaded config file"),
        None => debug!("no datalens.json found, using defaults and env/cli overrides"),
    }
    Ok(config)
}

fn cli_overrides(cli: &Cli) -> PartialConfig {
    PartialConfig {
        page_size: cli.page_size,
        threshold: cli.threshold,
        store_dir: cli.store_dir.clone(),
        store_read_only: None,
        data_dir: None,
        dev: cli.dev.then_some(true),
    }
}

fn report_error(e: &CliError, dev: bool) {
    match e {
        CliError::Core(inner) => {
            eprintln!("Error: {}", inner.user_message());
            if dev {
                if let Some(diag) = inner.diagnostic() {
                    eprintln!();
                    eprintln!("Diagnostic:");
                    for line in diag.lines() {
                        eprintln!("  {}", line);
                    }
                }
            }
        }
        other => eprintln!("Error: {}", other),
    }
}

fn run(cli: Cli, config: &Config) -> CliResult<()> {
    match cli.command {
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Show {
            data,
            view,
            page,
            columns,
            highlight,
        } => cmd_show(config, &data, &view, page, columns, highlight),
        Commands::Export {
            data,
            view,
            format,
            output,
        } => cmd_export(config, &data, &view, &format, &output),
        Commands::Stats { data, json } => cmd_stats(config, &data, json),
        Commands::Upload { kind, file } => cmd_upload(config, &kind, &file),
        Commands::Fetch { kind, output } => cmd_fetch(config, &kind, output.as_deref()),
    }
}

fn parse_kind(kind: &str) -> CliResult<DatasetKind> {
    DatasetKind::parse(kind).ok_or_else(|| {
        CliError::Usage(format!(
            "unknown dataset '{}', expected threads or non-threads",
            kind
        ))
    })
}

fn open_store(config: &Config) -> DirectoryStore {
    if config.store_read_only {
        DirectoryStore::read_only(&config.store_dir)
    } else {
        DirectoryStore::new(&config.store_dir)
    }
}

/// Build a dashboard from the requested data source
fn load_dashboard(config: &Config, data: &DataArgs) -> CliResult<Dashboard> {
    let mut dash =
        Dashboard::with_highlighter(Box::new(ScoreThreshold::with_threshold(config.threshold)));
    dash.set_page_size(config.page_size);

    if data.from_store {
        let store = open_store(config);
        for kind in DatasetKind::ALL {
            match store.get(kind)? {
                Some(content) => {
                    dash.load_csv(kind, &content, kind.doc_id())?;
                }
                None => warn!(dataset = %kind, "dataset not found in store"),
            }
        }
    } else {
        let mut threads = data.threads.clone();
        let mut non_threads = data.non_threads.clone();

        if threads.is_none() && non_threads.is_none() {
            let dir = data
                .data_dir
                .clone()
                .or_else(|| config.data_dir.clone())
                .ok_or_else(|| {
                    CliError::Usage(
                        "no data source given: use --threads/--non-threads, --data-dir or --from-store"
                            .to_string(),
                    )
                })?;
            let found = discover_datasets(&dir)?;
            threads = found.threads;
            non_threads = found.non_threads;
        }

        if let Some(path) = threads {
            dash.load_file(DatasetKind::Threads, path)?;
        }
        if let Some(path) = non_threads {
            dash.load_file(DatasetKind::NonThreads, path)?;
        }
    }

    while let Some(note) = dash.take_notification() {
        eprintln!("Note: {}", note);
    }

    Ok(dash)
}

fn apply_view(dash: &mut Dashboard, view: &ViewArgs) -> CliResult<()> {
    if let Some(filter) = &view.filter {
        dash.set_global_filter(filter.as_str());
    }

    for entry in &view.column_filters {
        let (column, pattern) = entry.split_once('=').ok_or_else(|| {
            CliError::Usage(format!(
                "invalid column filter '{}', expected column=pattern",
                entry
            ))
        })?;
        dash.set_column_filter(column.trim(), pattern);
    }

    for key in &view.sort {
        dash.request_sort(key);
    }

    Ok(())
}

fn print_no_data() {
    println!("No data found.");
    println!("Provide --threads/--non-threads files, a --data-dir, or upload datasets to the store.");
}

fn cmd_parse(file: &Path) -> CliResult<()> {
    let content = std::fs::read_to_string(file).map_err(|e| datalens_core::Error::FileRead {
        path: file.to_path_buf(),
        source: e,
    })?;
    let report = parse_csv_report(&content, &file.display().to_string())?;
    let table = &report.table;

    println!("File: {}", file.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    if report.dropped_count() > 0 {
        println!("Dropped rows: {} (lines {:?})", report.dropped_count(), report.dropped_lines);
    }
    println!();

    println!("{}", table.headers.join("\t"));
    println!("{}", "-".repeat(table.headers.len() * 12));

    for row in table.rows.iter().take(10) {
        let values: Vec<&str> = table
            .headers
            .iter()
            .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
            .collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > 10 {
        println!("... ({} more rows)", table.row_count() - 10);
    }

    Ok(())
}

fn cmd_show(
    config: &Config,
    data: &DataArgs,
    view: &ViewArgs,
    page: usize,
    columns: Option<String>,
    highlight: bool,
) -> CliResult<()> {
    let mut dash = load_dashboard(config, data)?;
    if dash.merged().is_none() {
        print_no_data();
        return Ok(());
    }

    apply_view(&mut dash, view)?;
    dash.set_page(page);
    if highlight {
        if let Err(e) = dash.set_highlight_enabled(true) {
            eprintln!("Note: {}", e.user_message());
        }
    }

    let col_filter: Option<Vec<&str>> = columns.as_ref().map(|c| c.split(',').collect());
    let display_cols: Vec<&String> = match &col_filter {
        Some(filter) => dash
            .headers()
            .iter()
            .filter(|h| filter.contains(&h.as_str()))
            .collect(),
        None => dash.headers().iter().collect(),
    };

    let mut header: Vec<&str> = display_cols.iter().map(|c| c.as_str()).collect();
    if highlight {
        header.insert(0, "Highlight");
    }
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let rows = dash.page_rows();
    if rows.is_empty() {
        println!("No results found.");
    }
    for page_row in &rows {
        let mut values: Vec<&str> = display_cols
            .iter()
            .map(|col| page_row.row.get(col).unwrap_or(""))
            .collect();
        if highlight {
            values.insert(0, highlight_marker(page_row.highlight));
        }
        println!("{}", values.join("\t"));
    }

    println!();
    let total_pages = dash.total_pages();
    if total_pages > 1 {
        println!("Page {} of {}", page, total_pages);
    }
    println!("{}", dash.summary());

    Ok(())
}

fn highlight_marker(class: Classification) -> &'static str {
    match class {
        Classification::Red => "RED",
        Classification::Green => "green",
        Classification::None => "",
    }
}

/// One exported row as a JSON object, keys in merged header order
struct JsonRow<'a> {
    headers: &'a [String],
    row: &'a CombinedRow,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for column in self.headers {
            map.serialize_entry(column, self.row.get(column).unwrap_or(""))?;
        }
        map.end()
    }
}

fn cmd_export(
    config: &Config,
    data: &DataArgs,
    view: &ViewArgs,
    format: &str,
    output: &Path,
) -> CliResult<()> {
    let mut dash = load_dashboard(config, data)?;
    if dash.merged().is_none() {
        print_no_data();
        return Ok(());
    }
    apply_view(&mut dash, view)?;

    match format.to_lowercase().as_str() {
        "csv" => dash.export_to(output)?,
        "json" => {
            let file = File::create(output)?;
            let mut writer = BufWriter::new(file);
            let headers = dash.headers();
            let rows: Vec<_> = dash
                .sorted_rows()
                .into_iter()
                .map(|row| JsonRow { headers, row })
                .collect();
            let json = serde_json::to_string_pretty(&rows)?;
            writeln!(writer, "{}", json)?;
        }
        _ => {
            return Err(CliError::Usage(format!(
                "unknown format: {}. Supported formats: csv, json",
                format
            )))
        }
    }

    println!(
        "Exported {} rows to {}",
        dash.filtered_count(),
        output.display()
    );

    Ok(())
}

fn cmd_stats(config: &Config, data: &DataArgs, json: bool) -> CliResult<()> {
    let dash = load_dashboard(config, data)?;
    let Some(chart) = dash.chart_data() else {
        print_no_data();
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&chart)?);
        return Ok(());
    }

    println!("Threads vs Non-Threads:");
    if chart.source_counts.is_empty() {
        println!("  (no rows)");
    }
    for count in &chart.source_counts {
        println!("  {:<12} {}", count.name, count.value);
    }
    println!();

    println!("Anomaly Score Distribution:");
    if !chart.has_anomaly_scores {
        println!("  `AnomalyScore` column not found or empty.");
        return Ok(());
    }
    println!("  {:<8} {:>8} {:>12}", "bin", "threads", "non-threads");
    for bin in &chart.score_histogram {
        println!("  {:<8} {:>8} {:>12}", bin.name, bin.threads, bin.non_threads);
    }

    Ok(())
}

fn cmd_upload(config: &Config, kind: &str, file: &Path) -> CliResult<()> {
    let kind = parse_kind(kind)?;

    // Parse first so a malformed file never reaches the store
    let content = std::fs::read_to_string(file).map_err(|e| datalens_core::Error::FileRead {
        path: file.to_path_buf(),
        source: e,
    })?;
    let report = parse_csv_report(&content, &file.display().to_string())?;

    let mut store = open_store(config);
    upload_file(&mut store, kind, file)?;

    println!(
        "Uploaded {} ({} rows) as '{}' to {}",
        file.display(),
        report.table.row_count(),
        kind,
        config.store_dir.display()
    );
    if report.dropped_count() > 0 {
        println!("  {} malformed rows will be skipped when viewed", report.dropped_count());
    }

    Ok(())
}

fn cmd_fetch(config: &Config, kind: &str, output: Option<&Path>) -> CliResult<()> {
    let kind = parse_kind(kind)?;
    let store = open_store(config);

    let content = store.get(kind)?.ok_or_else(|| {
        CliError::Usage(format!("no '{}' document in {}", kind, config.store_dir.display()))
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &content)?;
            println!("Wrote '{}' to {}", kind, path.display());
        }
        None => print!("{}", content),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_config(store_dir: &Path) -> Config {
        Config {
            store_dir: store_dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_cli_parses_show() {
        let cli = Cli::parse_from([
            "datalens",
            "show",
            "--threads",
            "t.csv",
            "--where",
            "name=foo",
            "--sort",
            "id",
            "--sort",
            "id",
            "--page",
            "2",
            "--highlight",
            "--page-size",
            "10",
        ]);

        assert_eq!(cli.page_size, Some(10));
        match cli.command {
            Commands::Show {
                data,
                view,
                page,
                highlight,
                ..
            } => {
                assert_eq!(data.threads.as_deref(), Some(Path::new("t.csv")));
                assert_eq!(view.column_filters, vec!["name=foo"]);
                assert_eq!(view.sort, vec!["id", "id"]);
                assert_eq!(page, 2);
                assert!(highlight);
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_export_default_output() {
        let cli = Cli::parse_from(["datalens", "export", "--data-dir", "data"]);
        match cli.command {
            Commands::Export { output, format, .. } => {
                assert_eq!(output, PathBuf::from("filtered_data.csv"));
                assert_eq!(format, "csv");
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn test_apply_view_rejects_bad_filter() {
        let mut dash = Dashboard::new();
        let view = ViewArgs {
            column_filters: vec!["nocolumn".to_string()],
            ..ViewArgs::default()
        };
        assert!(matches!(apply_view(&mut dash, &view), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_load_from_data_dir_and_export() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("threads.csv"), "id,name\n1,foo\n2,bar\n").unwrap();
        fs::write(temp.path().join("nonthreads.csv"), "id,name\n3,baz\n").unwrap();

        let config = test_config(&temp.path().join("store"));
        let data = DataArgs {
            data_dir: Some(temp.path().to_path_buf()),
            ..DataArgs::default()
        };
        let view = ViewArgs {
            filter: Some("BA".to_string()),
            sort: vec!["name".to_string()],
            ..ViewArgs::default()
        };

        let output = temp.path().join("out.csv");
        cmd_export(&config, &data, &view, "csv", &output).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        assert_eq!(text, "\"id\",\"name\"\n\"2\",\"bar\"\n\"3\",\"baz\"");
    }

    #[test]
    fn test_json_export_keeps_header_order() {
        let temp = tempfile::tempdir().unwrap();
        let threads = temp.path().join("threads.csv");
        fs::write(&threads, "zeta,alpha\n1,2\n").unwrap();
        let non_threads = temp.path().join("nonthreads.csv");
        fs::write(&non_threads, "mid\n3\n").unwrap();

        let config = test_config(&temp.path().join("store"));
        let data = DataArgs {
            threads: Some(threads),
            non_threads: Some(non_threads),
            ..DataArgs::default()
        };

        let output = temp.path().join("out.json");
        cmd_export(&config, &data, &ViewArgs::default(), "json", &output).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        let mid = text.find("\"mid\"").unwrap();
        assert!(zeta < alpha && alpha < mid);

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["alpha"], "2");
        assert_eq!(parsed[0]["mid"], "");
        assert_eq!(parsed[1]["mid"], "3");
    }

    #[test]
    fn test_upload_then_load_from_store() {
        let temp = tempfile::tempdir().unwrap();
        let csv = temp.path().join("threads.csv");
        fs::write(&csv, "id,AnomalyScore\n1,0.9\n").unwrap();

        let config = test_config(&temp.path().join("store"));
        cmd_upload(&config, "threads", &csv).unwrap();

        let data = DataArgs {
            from_store: true,
            ..DataArgs::default()
        };
        let dash = load_dashboard(&config, &data).unwrap();
        assert_eq!(dash.total_rows(), 1);
        assert!(dash.table(DatasetKind::NonThreads).is_none());
    }

    #[test]
    fn test_upload_read_only_store() {
        let temp = tempfile::tempdir().unwrap();
        let csv = temp.path().join("threads.csv");
        fs::write(&csv, "id\n1\n").unwrap();

        let config = Config {
            store_read_only: true,
            ..test_config(&temp.path().join("store"))
        };
        let err = cmd_upload(&config, "threads", &csv).unwrap_err();
        match err {
            CliError::Core(inner) => {
                assert_eq!(inner.kind(), datalens_core::ErrorKind::Permission);
                assert!(inner.diagnostic().is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_data_source() {
        let config = Config::default();
        let result = load_dashboard(&config, &DataArgs::default());
        assert!(matches!(result, Err(CliError::Usage(_))));
    }

    #[test]
    fn test_unknown_kind() {
        assert!(parse_kind("everything").is_err());
        assert_eq!(parse_kind("non-threads").unwrap(), DatasetKind::NonThreads);
    }
}
