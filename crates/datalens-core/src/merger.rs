//! Merge the two datasets into one table with provenance tracking

use crate::export::CellSource;
use crate::table::{DatasetKind, ParsedTable, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable synthetic key assigned to each row at merge time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(pub usize);

/// A merged row with its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    /// Position of the row in the merged dataset
    pub key: RowKey,
    /// Dataset the row came from
    pub source: DatasetKind,
    /// Cell values; only the source table's columns are present
    pub values: Record,
}

impl CombinedRow {
    /// Get a cell value by column name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

impl CellSource for CombinedRow {
    fn cell(&self, column: &str) -> Option<&str> {
        self.get(column)
    }
}

/// The union of both datasets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedTable {
    /// Union of headers, first-seen order, threads before non-threads
    pub headers: Vec<String>,
    /// All rows, threads first
    pub rows: Vec<CombinedRow>,
}

impl MergedTable {
    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a row by key
    pub fn find_row(&self, key: RowKey) -> Option<&CombinedRow> {
        self.rows.get(key.0).filter(|r| r.key == key)
    }

    /// Number of rows from one dataset
    pub fn count_from(&self, kind: DatasetKind) -> usize {
        self.rows.iter().filter(|r| r.source == kind).count()
    }
}

/// Merge the threads and non-threads tables; `None` when both are absent
pub fn merge_tables(
    threads: Option<&ParsedTable>,
    non_threads: Option<&ParsedTable>,
) -> Option<MergedTable> {
    if threads.is_none() && non_threads.is_none() {
        return None;
    }

    let sources = [
        (DatasetKind::Threads, threads),
        (DatasetKind::NonThreads, non_threads),
    ];

    let mut headers: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for table in sources.iter().filter_map(|(_, t)| *t) {
        for header in &table.headers {
            if seen.insert(header.as_str()) {
                headers.push(header.clone());
            }
        }
    }

    let mut rows: Vec<CombinedRow> = Vec::new();
    for (kind, table) in sources {
        let Some(table) = table else { continue };
        for record in &table.rows {
            rows.push(CombinedRow {
                key: RowKey(rows.len()),
                source: kind,
                values: record.clone(),
            });
        }
    }

    Some(MergedTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    #[test]
    fn test_merge_none() {
        assert!(merge_tables(None, None).is_none());
    }

    #[test]
    fn test_merge_single_table() {
        let threads = parse_csv_str("id,name\n1,foo\n2,bar\n", "threads.csv").unwrap();

        let merged = merge_tables(Some(&threads), None).unwrap();
        assert_eq!(merged.headers, vec!["id", "name"]);
        assert_eq!(merged.row_count(), 2);
        assert!(merged.rows.iter().all(|r| r.source == DatasetKind::Threads));
    }

    #[test]
    fn test_merge_header_union() {
        let threads = parse_csv_str("id,name,score\n1,foo,0.1\n", "threads.csv").unwrap();
        let non_threads = parse_csv_str("id,extra,name\n2,bonus,bar\n", "non.csv").unwrap();

        let merged = merge_tables(Some(&threads), Some(&non_threads)).unwrap();
        assert_eq!(merged.headers, vec!["id", "name", "score", "extra"]);
    }

    #[test]
    fn test_merge_order_and_keys() {
        let threads = parse_csv_str("id\n1\n2\n", "threads.csv").unwrap();
        let non_threads = parse_csv_str("id\n3\n", "non.csv").unwrap();

        let merged = merge_tables(Some(&threads), Some(&non_threads)).unwrap();
        let ids: Vec<&str> = merged.rows.iter().filter_map(|r| r.get("id")).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let keys: Vec<usize> = merged.rows.iter().map(|r| r.key.0).collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(merged.rows[2].source, DatasetKind::NonThreads);
        assert_eq!(merged.count_from(DatasetKind::Threads), 2);
        assert_eq!(merged.find_row(RowKey(2)).unwrap().get("id"), Some("3"));
    }

    #[test]
    fn test_merge_only_non_threads() {
        let non_threads = parse_csv_str("id\n3\n", "non.csv").unwrap();

        let merged = merge_tables(None, Some(&non_threads)).unwrap();
        assert_eq!(merged.rows[0].key, RowKey(0));
        assert_eq!(merged.rows[0].source, DatasetKind::NonThreads);
    }
}
