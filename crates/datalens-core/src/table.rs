//! Core table types for the parsed datasets

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single row: column name to raw string value
pub type Record = BTreeMap<String, String>;

/// A table parsed from one CSV blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTable {
    /// Column names in source order, without duplicates
    pub headers: Vec<String>,
    /// Rows; every row holds exactly the keys in `headers`
    pub rows: Vec<Record>,
}

impl ParsedTable {
    /// Create a table with the given headers and no rows
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Get a cell value by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
    }
}

/// Which of the two datasets a table or row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetKind {
    #[serde(rename = "thread")]
    Threads,
    #[serde(rename = "non-thread")]
    NonThreads,
}

impl DatasetKind {
    /// Both kinds, in merge order
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Threads, DatasetKind::NonThreads];

    /// Provenance tag attached to merged rows
    pub fn tag(self) -> &'static str {
        match self {
            DatasetKind::Threads => "thread",
            DatasetKind::NonThreads => "non-thread",
        }
    }

    /// Document id in the store
    pub fn doc_id(self) -> &'static str {
        match self {
            DatasetKind::Threads => "threads",
            DatasetKind::NonThreads => "non-threads",
        }
    }

    /// Label used in chart data
    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::Threads => "Threads",
            DatasetKind::NonThreads => "Non-Threads",
        }
    }

    /// Parse a document id, provenance tag or label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threads" | "thread" => Some(DatasetKind::Threads),
            "non-threads" | "non-thread" | "nonthreads" | "non_threads" => {
                Some(DatasetKind::NonThreads)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.doc_id())
    }
}

/// A cell value with type detection, used for ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Empty/missing cell
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        if is_float_literal(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return CellValue::Float(f);
                }
            }
        }

        CellValue::String(s.to_string())
    }

    /// Parse an optional cell; a missing cell is `Empty`
    pub fn from_cell(s: Option<&str>) -> Self {
        s.map(CellValue::parse).unwrap_or(CellValue::Empty)
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric value, if the cell holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Empty => 0,
            CellValue::Integer(_) | CellValue::Float(_) => 1,
            CellValue::String(_) => 2,
        }
    }

    /// Total ordering: empty cells, then numbers, then text
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (CellValue::String(a), CellValue::String(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

/// `f64::from_str` also accepts words like `inf` and `NaN`; those stay text
fn is_float_literal(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_parse() {
        assert_eq!(CellValue::parse("42"), CellValue::Integer(42));
        assert_eq!(CellValue::parse("-2.5"), CellValue::Float(-2.5));
        assert_eq!(
            CellValue::parse("hello"),
            CellValue::String("hello".to_string())
        );
        assert_eq!(CellValue::parse("   "), CellValue::Empty);
        assert_eq!(CellValue::from_cell(None), CellValue::Empty);
        assert_eq!(CellValue::parse("1e3"), CellValue::Float(1000.0));
    }

    #[test]
    fn test_cell_value_parse_float_words_stay_text() {
        for word in ["inf", "Infinity", "nan", "NaN", "-inf"] {
            assert_eq!(CellValue::parse(word), CellValue::String(word.to_string()));
        }
        // overflows to infinity
        assert_eq!(
            CellValue::parse("1e999"),
            CellValue::String("1e999".to_string())
        );
    }

    #[test]
    fn test_sort_cmp_numbers_numerically() {
        let nine = CellValue::parse("9");
        let ten = CellValue::parse("10");
        assert_eq!(nine.sort_cmp(&ten), Ordering::Less);

        let half = CellValue::parse("0.5");
        let one = CellValue::parse("1");
        assert_eq!(half.sort_cmp(&one), Ordering::Less);
    }

    #[test]
    fn test_sort_cmp_mixed_is_total() {
        let empty = CellValue::Empty;
        let num = CellValue::parse("3");
        let text = CellValue::parse("abc");

        assert_eq!(empty.sort_cmp(&num), Ordering::Less);
        assert_eq!(num.sort_cmp(&text), Ordering::Less);
        assert_eq!(text.sort_cmp(&empty), Ordering::Greater);
        assert_eq!(empty.sort_cmp(&CellValue::Empty), Ordering::Equal);
    }

    #[test]
    fn test_dataset_kind_names() {
        assert_eq!(DatasetKind::Threads.tag(), "thread");
        assert_eq!(DatasetKind::NonThreads.doc_id(), "non-threads");
        assert_eq!(DatasetKind::parse("nonthreads"), Some(DatasetKind::NonThreads));
        assert_eq!(DatasetKind::parse("Threads"), Some(DatasetKind::Threads));
        assert_eq!(DatasetKind::parse("other"), None);
    }

    #[test]
    fn test_parsed_table_lookup() {
        let mut table = ParsedTable::new(vec!["a".to_string(), "b".to_string()]);
        let mut row = Record::new();
        row.insert("a".to_string(), "1".to_string());
        row.insert("b".to_string(), "2".to_string());
        table.rows.push(row);

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 1);
        assert!(table.has_column("b"));
        assert_eq!(table.get(0, "a"), Some("1"));
        assert_eq!(table.get(0, "z"), None);
    }
}
