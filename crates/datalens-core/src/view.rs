//! Filter, sort and paginate the merged rows

use crate::merger::CombinedRow;
use crate::table::CellValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Rows shown per page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Column name to substring pattern
pub type ColumnFilters = BTreeMap<String, String>;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// The single active sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending sort on a column
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on a column
    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Next sort after the user asks to sort by `key`.
    ///
    /// Asking again for the ascending key flips it to descending; anything
    /// else starts over ascending.
    pub fn request(current: Option<&SortSpec>, key: &str) -> SortSpec {
        match current {
            Some(spec) if spec.key == key && spec.direction == SortDirection::Ascending => {
                SortSpec::descending(key)
            }
            _ => SortSpec::ascending(key),
        }
    }
}

/// Check whether a row passes the global and column filters
pub fn row_matches(row: &CombinedRow, global: &str, columns: &ColumnFilters) -> bool {
    let matches_global = if global.is_empty() {
        true
    } else {
        let needle = global.to_lowercase();
        row.values
            .values()
            .any(|v| v.to_lowercase().contains(&needle))
    };

    matches_global
        && columns.iter().all(|(column, pattern)| {
            if pattern.is_empty() {
                return true;
            }
            match row.get(column) {
                Some(value) => value.to_lowercase().contains(&pattern.to_lowercase()),
                None => false,
            }
        })
}

/// Keep the rows that pass the filters, in order
pub fn filter_rows<'a, I>(rows: I, global: &str, columns: &ColumnFilters) -> Vec<&'a CombinedRow>
where
    I: IntoIterator<Item = &'a CombinedRow>,
{
    rows.into_iter()
        .filter(|row| row_matches(row, global, columns))
        .collect()
}

/// Stable sort by the spec; `None` keeps the input order
pub fn sort_rows<'a>(rows: &[&'a CombinedRow], spec: Option<&SortSpec>) -> Vec<&'a CombinedRow> {
    let mut sorted = rows.to_vec();
    let Some(spec) = spec else {
        return sorted;
    };

    sorted.sort_by(|a, b| {
        let ord = compare_cells(a.get(&spec.key), b.get(&spec.key));
        match spec.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    sorted
}

fn compare_cells(a: Option<&str>, b: Option<&str>) -> Ordering {
    CellValue::from_cell(a).sort_cmp(&CellValue::from_cell(b))
}

/// Rows on a 1-indexed page; page 0 or past the end is empty
pub fn paginate<T>(rows: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= rows.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(rows.len());
    &rows[start..end]
}

/// Number of pages needed for `count` rows
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Filter, sort and page state for one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub global_filter: String,
    pub column_filters: ColumnFilters,
    pub sort: Option<SortSpec>,
    /// 1-indexed current page
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            global_filter: String::new(),
            column_filters: ColumnFilters::new(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewState {
    /// Record a sort request on a column
    pub fn request_sort(&mut self, key: &str) {
        self.sort = Some(SortSpec::request(self.sort.as_ref(), key));
    }

    /// Set or clear a column filter
    pub fn set_column_filter(&mut self, column: impl Into<String>, pattern: impl Into<String>) {
        let pattern = pattern.into();
        let column = column.into();
        if pattern.is_empty() {
            self.column_filters.remove(&column);
        } else {
            self.column_filters.insert(column, pattern);
        }
    }

    /// Filtered and sorted rows (not paginated)
    pub fn apply<'a>(&self, rows: &'a [CombinedRow]) -> Vec<&'a CombinedRow> {
        let filtered = filter_rows(rows, &self.global_filter, &self.column_filters);
        sort_rows(&filtered, self.sort.as_ref())
    }
}
