//! CSV export of table rows
//!
//! Every header and field is quoted. Output is newline-joined with no
//! trailing newline, so exported text is valid RFC4180 but not byte-identical
//! to the input it came from.

use crate::error::Result;
use std::fs;
use std::path::Path;

/// File name used when the caller does not pick one
pub const DEFAULT_EXPORT_FILE: &str = "filtered_data.csv";

/// Anything that can hand out a cell value by column name
pub trait CellSource {
    fn cell(&self, column: &str) -> Option<&str>;
}

impl CellSource for crate::table::Record {
    fn cell(&self, column: &str) -> Option<&str> {
        self.get(column).map(String::as_str)
    }
}

impl<T: CellSource + ?Sized> CellSource for &T {
    fn cell(&self, column: &str) -> Option<&str> {
        (**self).cell(column)
    }
}

/// Serialize headers and rows into CSV text
pub fn to_csv_string<R: CellSource>(headers: &[String], rows: &[R]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|h| row.cell(h).unwrap_or("")))?;
    }

    let mut bytes = writer.into_inner().map_err(|e| e.into_error())?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write headers and rows as CSV to a file
pub fn export_csv<P: AsRef<Path>, R: CellSource>(
    path: P,
    headers: &[String],
    rows: &[R],
) -> Result<()> {
    let text = to_csv_string(headers, rows)?;
    fs::write(path.as_ref(), text)?;
    tracing::info!(path = %path.as_ref().display(), rows = rows.len(), "exported CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;
    use crate::table::Record;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_serialize_quotes_everything() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![record(&[("a", "1"), ("b", "2,3")])];

        let text = to_csv_string(&headers, &rows).unwrap();
        assert_eq!(text, "\"a\",\"b\"\n\"1\",\"2,3\"");
    }

    #[test]
    fn test_serialize_escapes_quotes_and_missing_values() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![record(&[("a", "say \"hi\"")])];

        let text = to_csv_string(&headers, &rows).unwrap();
        assert_eq!(text, "\"a\",\"b\"\n\"say \"\"hi\"\"\",\"\"");
    }

    #[test]
    fn test_serialize_header_only() {
        let headers = vec!["a".to_string()];
        let rows: Vec<Record> = Vec::new();
        assert_eq!(to_csv_string(&headers, &rows).unwrap(), "\"a\"");
    }

    #[test]
    fn test_value_level_round_trip() {
        let source = "id,note\n1,plain\n2,\"with, comma\"\n3,\"a \"\"quote\"\"\"\n";
        let table = parse_csv_str(source, "src.csv").unwrap();

        let text = to_csv_string(&table.headers, &table.rows).unwrap();
        let reparsed = parse_csv_str(&text, "out.csv").unwrap();

        assert_eq!(reparsed, table);
        assert_ne!(text, source.trim());
    }

    #[test]
    fn test_export_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_EXPORT_FILE);
        let headers = vec!["a".to_string()];
        let rows = vec![record(&[("a", "1")])];

        export_csv(&path, &headers, &rows).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\"a\"\n\"1\"");
    }
}
