//! datalens-core: Core library for exploring the threads / non-threads CSV datasets
//!
//! This library provides functionality to:
//! - Parse CSV text into tables, dropping malformed rows
//! - Export rows back to fully quoted CSV
//! - Merge both datasets with provenance and stable row keys
//! - Filter, sort and paginate the merged rows
//! - Classify rows as anomalous from a score or a pluggable classifier
//! - Compute chart aggregates, find dataset files and store raw CSV documents

pub mod dashboard;
pub mod error;
pub mod export;
pub mod highlight;
pub mod merger;
pub mod parser;
pub mod scanner;
pub mod session;
pub mod stats;
pub mod store;
pub mod table;
pub mod view;

pub use dashboard::{Dashboard, PageRow};
pub use error::{Error, ErrorKind, PermissionContext, Result};
pub use export::{export_csv, to_csv_string, CellSource, DEFAULT_EXPORT_FILE};
pub use highlight::{Classification, HighlightMap, Highlighter, ScoreThreshold};
pub use merger::{merge_tables, CombinedRow, MergedTable, RowKey};
pub use parser::{parse_csv, parse_csv_report, parse_csv_str, ParseReport};
pub use scanner::{discover_datasets, DatasetPaths};
pub use session::{guard, Access, Route, Session};
pub use stats::{chart_data, ChartData, ScoreBin, SourceCount};
pub use store::{upload_file, DirectoryStore, DocumentStore};
pub use table::{CellValue, DatasetKind, ParsedTable, Record};
pub use view::{filter_rows, paginate, sort_rows, ColumnFilters, SortDirection, SortSpec, ViewState};
