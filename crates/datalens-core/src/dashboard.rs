//! The in-memory view session
//!
//! A [`Dashboard`] owns the two parsed datasets, their merge, the view state
//! and the highlight map. The merge and the highlight map are rebuilt whenever
//! a dataset is loaded or cleared, or highlighting is toggled.

use crate::error::{Error, Result};
use crate::export::{export_csv, to_csv_string};
use crate::highlight::{Classification, HighlightMap, Highlighter, ScoreThreshold};
use crate::merger::{merge_tables, CombinedRow, MergedTable};
use crate::parser::{parse_csv_report, ParseReport};
use crate::stats::{chart_data, summary_line, ChartData};
use crate::table::{DatasetKind, ParsedTable};
use crate::view::{paginate, total_pages, ViewState};
use std::path::Path;
use tracing::{info, warn};

/// A visible row and its highlight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRow<'a> {
    pub row: &'a CombinedRow,
    pub highlight: Classification,
}

/// In-memory view session over the threads and non-threads datasets
///
/// Owns both parsed tables, their merge, the filter/sort/page state and the
/// highlight map. Loading, clearing and toggling highlights rebuild the merge
/// and the highlight map; view changes only affect how rows are read back.
pub struct Dashboard {
    threads: Option<ParsedTable>,
    non_threads: Option<ParsedTable>,
    merged: Option<MergedTable>,
    view: ViewState,
    highlighter: Box<dyn Highlighter>,
    highlight_enabled: bool,
    highlights: HighlightMap,
    notification: Option<String>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    /// Empty dashboard using the score-threshold highlighter
    pub fn new() -> Self {
        Self::with_highlighter(Box::new(ScoreThreshold::default()))
    }

    /// Empty dashboard using a custom highlighter
    pub fn with_highlighter(highlighter: Box<dyn Highlighter>) -> Self {
        Self {
            threads: None,
            non_threads: None,
            merged: None,
            view: ViewState::default(),
            highlighter,
            highlight_enabled: false,
            highlights: HighlightMap::default(),
            notification: None,
        }
    }

    /// Parse CSV text into one dataset; on error the previous data stays
    pub fn load_csv(&mut self, kind: DatasetKind, content: &str, source_name: &str) -> Result<ParseReport> {
        let report = parse_csv_report(content, source_name)?;
        if report.dropped_count() > 0 {
            self.notification = Some(format!(
                "Skipped {} malformed row(s) in {}",
                report.dropped_count(),
                source_name
            ));
        }
        self.set_table(kind, report.table.clone());
        Ok(report)
    }

    /// Parse a CSV file into one dataset
    pub fn load_file<P: AsRef<Path>>(&mut self, kind: DatasetKind, path: P) -> Result<ParseReport> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load_csv(kind, &content, &path.display().to_string())
    }

    /// Replace one dataset with an already parsed table
    pub fn set_table(&mut self, kind: DatasetKind, table: ParsedTable) {
        info!(dataset = %kind, rows = table.row_count(), "loaded dataset");
        match kind {
            DatasetKind::Threads => self.threads = Some(table),
            DatasetKind::NonThreads => self.non_threads = Some(table),
        }
        self.rebuild();
    }

    /// Discard both datasets
    pub fn clear(&mut self) {
        self.threads = None;
        self.non_threads = None;
        self.rebuild();
        self.notification = Some("Local data cleared.".to_string());
    }

    /// One of the parsed datasets
    pub fn table(&self, kind: DatasetKind) -> Option<&ParsedTable> {
        match kind {
            DatasetKind::Threads => self.threads.as_ref(),
            DatasetKind::NonThreads => self.non_threads.as_ref(),
        }
    }

    /// The merged dataset; `None` when nothing is loaded
    pub fn merged(&self) -> Option<&MergedTable> {
        self.merged.as_ref()
    }

    /// Union of headers, or nothing when no data is loaded
    pub fn headers(&self) -> &[String] {
        self.merged.as_ref().map(|m| m.headers.as_slice()).unwrap_or(&[])
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn set_global_filter(&mut self, pattern: impl Into<String>) {
        self.view.global_filter = pattern.into();
    }

    pub fn set_column_filter(&mut self, column: impl Into<String>, pattern: impl Into<String>) {
        self.view.set_column_filter(column, pattern);
    }

    pub fn request_sort(&mut self, key: &str) {
        self.view.request_sort(key);
    }

    /// Select a 1-indexed page
    pub fn set_page(&mut self, page: usize) {
        self.view.page = page;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.view.page_size = page_size;
    }

    pub fn highlight_enabled(&self) -> bool {
        self.highlight_enabled
    }

    /// Toggle highlighting and recompute classifications
    pub fn set_highlight_enabled(&mut self, enabled: bool) -> Result<()> {
        self.highlight_enabled = enabled;
        self.refresh_highlights()
    }

    /// Recompute classifications; a failure clears them
    pub fn refresh_highlights(&mut self) -> Result<()> {
        let rows: &[CombinedRow] = self.merged.as_ref().map(|m| m.rows.as_slice()).unwrap_or(&[]);
        match HighlightMap::compute(self.highlighter.as_ref(), rows, self.highlight_enabled) {
            Ok(map) => {
                self.highlights = map;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "highlighting failed");
                self.highlights = HighlightMap::default();
                self.notification = Some(e.user_message());
                Err(e)
            }
        }
    }

    pub fn highlights(&self) -> &HighlightMap {
        &self.highlights
    }

    /// Take the pending user notification, if any
    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    /// Total rows in the merged dataset
    pub fn total_rows(&self) -> usize {
        self.merged.as_ref().map(MergedTable::row_count).unwrap_or(0)
    }

    /// Filtered and sorted rows, all pages
    pub fn sorted_rows(&self) -> Vec<&CombinedRow> {
        match &self.merged {
            Some(merged) => self.view.apply(&merged.rows),
            None => Vec::new(),
        }
    }

    /// Number of rows passing the filters
    pub fn filtered_count(&self) -> usize {
        self.sorted_rows().len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered_count(), self.view.page_size)
    }

    /// Rows on the current page with their highlights
    pub fn page_rows(&self) -> Vec<PageRow<'_>> {
        let sorted = self.sorted_rows();
        paginate(&sorted, self.view.page, self.view.page_size)
            .iter()
            .map(|&row| PageRow {
                row,
                highlight: self.highlights.get(row.key),
            })
            .collect()
    }

    /// Chart aggregates; `None` when nothing is loaded
    pub fn chart_data(&self) -> Option<ChartData> {
        self.merged.as_ref().map(chart_data)
    }

    /// "Displaying X of Y total rows."
    pub fn summary(&self) -> String {
        summary_line(self.filtered_count(), self.total_rows())
    }

    /// Filtered and sorted rows as CSV text
    pub fn export_csv_string(&self) -> Result<String> {
        to_csv_string(self.headers(), &self.sorted_rows())
    }

    /// Write filtered and sorted rows to a CSV file
    pub fn export_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        export_csv(path, self.headers(), &self.sorted_rows())
    }

    fn rebuild(&mut self) {
        self.merged = merge_tables(self.threads.as_ref(), self.non_threads.as_ref());
        // failures are logged and kept as the pending notification
        let _ = self.refresh_highlights();
    }
}
