//! CSV parser for the threads / non-threads datasets
//!
//! Input is split into lines before tokenizing, so quoted fields cannot span
//! lines. Rows whose field count differs from the header are dropped and
//! logged rather than padded or truncated.

use crate::error::{Error, Result};
use crate::table::{ParsedTable, Record};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A parsed table along with the rows that were skipped
#[derive(Debug, Clone)]
pub struct ParseReport {
    /// The parsed table
    pub table: ParsedTable,
    /// 1-based line numbers of rows dropped for a field count mismatch
    pub dropped_lines: Vec<usize>,
}

impl ParseReport {
    /// Number of dropped rows
    pub fn dropped_count(&self) -> usize {
        self.dropped_lines.len()
    }
}

/// Parse a CSV file into a table
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<ParsedTable> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_csv_str(&content, &path.display().to_string())
}

/// Parse CSV text into a table
pub fn parse_csv_str(content: &str, source_name: &str) -> Result<ParsedTable> {
    parse_csv_report(content, source_name).map(|report| report.table)
}

/// Parse CSV text, keeping track of dropped rows
pub fn parse_csv_report(content: &str, source_name: &str) -> Result<ParseReport> {
    let content = content.trim_start_matches('\u{feff}').trim();
    if content.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut lines = content.split('\n').enumerate();
    let (_, header_line) = lines.next().ok_or(Error::EmptyInput)?;

    let raw_headers = split_fields(header_line.trim())?;
    if raw_headers.iter().all(|h| h.is_empty()) {
        return Err(Error::EmptyInput);
    }

    // Column order follows the first occurrence of each name; the value
    // comes from the last occurrence
    let mut headers: Vec<String> = Vec::new();
    let mut last_position: HashMap<&str, usize> = HashMap::new();
    for (i, name) in raw_headers.iter().enumerate() {
        if last_position.insert(name.as_str(), i).is_none() {
            headers.push(name.clone());
        } else {
            warn!(source = source_name, column = %name, "duplicate header, later column wins");
        }
    }
    let header_positions: Vec<usize> = headers
        .iter()
        .map(|name| last_position[name.as_str()])
        .collect();

    let mut table = ParsedTable::new(headers);
    let mut dropped_lines = Vec::new();

    for (idx, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields = split_fields(line)?;
        if fields.len() != raw_headers.len() {
            warn!(
                source = source_name,
                line = idx + 1,
                expected = raw_headers.len(),
                found = fields.len(),
                "skipping malformed row"
            );
            dropped_lines.push(idx + 1);
            continue;
        }

        let record: Record = header_positions
            .iter()
            .map(|&i| {
                let value = fields.get(i).cloned().unwrap_or_default();
                (raw_headers[i].clone(), value)
            })
            .collect();
        table.rows.push(record);
    }

    debug!(
        source = source_name,
        columns = table.column_count(),
        rows = table.row_count(),
        dropped = dropped_lines.len(),
        "parsed CSV"
    );

    Ok(ParseReport {
        table,
        dropped_lines,
    })
}

/// Split a single line into fields, honouring double quotes and `""` escapes
pub fn split_fields(line: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    if reader.read_record(&mut record)? {
        Ok(record.iter().map(str::to_string).collect())
    } else {
        Ok(vec![String::new()])
    }
}
