//! C FFI bindings for datalens-core
//!
//! Exposes the dashboard through an opaque handle so a UI host can load
//! datasets, drive filters, sorting and paging, and read back cells.

use datalens_core::{Classification, Dashboard, DatasetKind};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

/// Opaque handle to a dashboard
pub struct FfiDashboard {
    inner: Dashboard,
}

/// Opaque handle to one rendered page, cells in header order
pub struct FfiPage {
    rows: Vec<Vec<String>>,
    highlights: Vec<Classification>,
}

/// Dataset selector: 0 = threads, 1 = non-threads
fn kind_from_int(kind: c_int) -> Option<DatasetKind> {
    match kind {
        0 => Some(DatasetKind::Threads),
        1 => Some(DatasetKind::NonThreads),
        _ => None,
    }
}

unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn into_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Create an empty dashboard
#[no_mangle]
pub extern "C" fn dl_dashboard_new() -> *mut FfiDashboard {
    Box::into_raw(Box::new(FfiDashboard {
        inner: Dashboard::new(),
    }))
}

/// Free a dashboard
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new` or null
#[no_mangle]
pub unsafe extern "C" fn dl_dashboard_free(dash: *mut FfiDashboard) {
    if !dash.is_null() {
        drop(Box::from_raw(dash));
    }
}

/// Load CSV text into one dataset. Returns 0 on success, -1 on error.
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - `csv` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn dl_load_csv(dash: *mut FfiDashboard, kind: c_int, csv: *const c_char) -> c_int {
    if dash.is_null() {
        return -1;
    }
    let (Some(kind), Some(csv)) = (kind_from_int(kind), str_arg(csv)) else {
        return -1;
    };

    match (*dash).inner.load_csv(kind, csv, kind.doc_id()) {
        Ok(_) => 0,
        Err(_) => -1,
    }
}

/// Discard both datasets
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
#[no_mangle]
pub unsafe extern "C" fn dl_clear(dash: *mut FfiDashboard) {
    if !dash.is_null() {
        (*dash).inner.clear();
    }
}

/// Set the free-text filter; null clears it
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - `pattern` must be a valid C string or null
#[no_mangle]
pub unsafe extern "C" fn dl_set_global_filter(dash: *mut FfiDashboard, pattern: *const c_char) {
    if dash.is_null() {
        return;
    }
    (*dash).inner.set_global_filter(str_arg(pattern).unwrap_or(""));
}

/// Set a column filter; a null or empty pattern removes it
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - `column` must be a valid C string; `pattern` a valid C string or null
#[no_mangle]
pub unsafe extern "C" fn dl_set_column_filter(
    dash: *mut FfiDashboard,
    column: *const c_char,
    pattern: *const c_char,
) {
    if dash.is_null() {
        return;
    }
    if let Some(column) = str_arg(column) {
        (*dash)
            .inner
            .set_column_filter(column, str_arg(pattern).unwrap_or(""));
    }
}

/// Request a sort on a column (same column again flips direction)
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - `key` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn dl_request_sort(dash: *mut FfiDashboard, key: *const c_char) {
    if dash.is_null() {
        return;
    }
    if let Some(key) = str_arg(key) {
        (*dash).inner.request_sort(key);
    }
}

/// Select a 1-indexed page
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
#[no_mangle]
pub unsafe extern "C" fn dl_set_page(dash: *mut FfiDashboard, page: usize) {
    if !dash.is_null() {
        (*dash).inner.set_page(page);
    }
}

/// Toggle highlighting. Returns 0 on success, -1 if classification failed.
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
#[no_mangle]
pub unsafe extern "C" fn dl_set_highlight(dash: *mut FfiDashboard, enabled: bool) -> c_int {
    if dash.is_null() {
        return -1;
    }
    match (*dash).inner.set_highlight_enabled(enabled) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Number of merged columns
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
#[no_mangle]
pub unsafe extern "C" fn dl_col_count(dash: *const FfiDashboard) -> usize {
    if dash.is_null() {
        return 0;
    }
    (*dash).inner.headers().len()
}

/// Get a column name by index
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `dl_free_string`
#[no_mangle]
pub unsafe extern "C" fn dl_col_name(dash: *const FfiDashboard, index: usize) -> *mut c_char {
    if dash.is_null() {
        return ptr::null_mut();
    }
    (*dash)
        .inner
        .headers()
        .get(index)
        .map(|name| into_c_string(name.as_str()))
        .unwrap_or(ptr::null_mut())
}

/// Rows in the merged dataset
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
#[no_mangle]
pub unsafe extern "C" fn dl_total_rows(dash: *const FfiDashboard) -> usize {
    if dash.is_null() {
        return 0;
    }
    (*dash).inner.total_rows()
}

/// Rows passing the current filters
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
#[no_mangle]
pub unsafe extern "C" fn dl_filtered_count(dash: *const FfiDashboard) -> usize {
    if dash.is_null() {
        return 0;
    }
    (*dash).inner.filtered_count()
}

/// Number of pages for the filtered rows
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
#[no_mangle]
pub unsafe extern "C" fn dl_total_pages(dash: *const FfiDashboard) -> usize {
    if dash.is_null() {
        return 0;
    }
    (*dash).inner.total_pages()
}

/// Take a snapshot of the current page
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - Caller must free the returned page with `dl_page_free`
#[no_mangle]
pub unsafe extern "C" fn dl_page_snapshot(dash: *const FfiDashboard) -> *mut FfiPage {
    if dash.is_null() {
        return ptr::null_mut();
    }
    let inner = &(*dash).inner;
    let headers = inner.headers();
    let mut rows = Vec::new();
    let mut highlights = Vec::new();
    for page_row in inner.page_rows() {
        rows.push(
            headers
                .iter()
                .map(|column| page_row.row.get(column).unwrap_or("").to_string())
                .collect(),
        );
        highlights.push(page_row.highlight);
    }
    Box::into_raw(Box::new(FfiPage { rows, highlights }))
}

/// Free a page snapshot
///
/// # Safety
/// - `page` must be a valid pointer returned by `dl_page_snapshot` or null
#[no_mangle]
pub unsafe extern "C" fn dl_page_free(page: *mut FfiPage) {
    if !page.is_null() {
        drop(Box::from_raw(page));
    }
}

/// Rows in a page snapshot
///
/// # Safety
/// - `page` must be a valid pointer returned by `dl_page_snapshot`
#[no_mangle]
pub unsafe extern "C" fn dl_page_row_count(page: *const FfiPage) -> usize {
    if page.is_null() {
        return 0;
    }
    (*page).rows.len()
}

/// Get a cell of a page snapshot as a string
///
/// # Safety
/// - `page` must be a valid pointer returned by `dl_page_snapshot`
/// - Returns null if row or col is out of bounds
/// - Caller must free the returned string with `dl_free_string`
#[no_mangle]
pub unsafe extern "C" fn dl_page_cell(page: *const FfiPage, row: usize, col: usize) -> *mut c_char {
    if page.is_null() {
        return ptr::null_mut();
    }
    (&(*page).rows)
        .get(row)
        .and_then(|cells| cells.get(col))
        .map(|cell| into_c_string(cell.as_str()))
        .unwrap_or(ptr::null_mut())
}

/// Highlight of a snapshot row: 0 = none, 1 = green, 2 = red, -1 = out of bounds
///
/// # Safety
/// - `page` must be a valid pointer returned by `dl_page_snapshot`
#[no_mangle]
pub unsafe extern "C" fn dl_page_highlight(page: *const FfiPage, row: usize) -> c_int {
    if page.is_null() {
        return -1;
    }
    match (&(*page).highlights).get(row) {
        Some(Classification::None) => 0,
        Some(Classification::Green) => 1,
        Some(Classification::Red) => 2,
        None => -1,
    }
}

/// Filtered and sorted rows as CSV text
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - Caller must free the returned string with `dl_free_string`
#[no_mangle]
pub unsafe extern "C" fn dl_export_csv(dash: *const FfiDashboard) -> *mut c_char {
    if dash.is_null() {
        return ptr::null_mut();
    }
    match (*dash).inner.export_csv_string() {
        Ok(text) => into_c_string(text),
        Err(_) => ptr::null_mut(),
    }
}

/// Chart aggregates as JSON; null when no data is loaded
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - Caller must free the returned string with `dl_free_string`
#[no_mangle]
pub unsafe extern "C" fn dl_chart_json(dash: *const FfiDashboard) -> *mut c_char {
    if dash.is_null() {
        return ptr::null_mut();
    }
    (*dash)
        .inner
        .chart_data()
        .and_then(|chart| serde_json::to_string(&chart).ok())
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Take the pending user notification; null when there is none
///
/// # Safety
/// - `dash` must be a valid pointer returned by `dl_dashboard_new`
/// - Caller must free the returned string with `dl_free_string`
#[no_mangle]
pub unsafe extern "C" fn dl_take_notification(dash: *mut FfiDashboard) -> *mut c_char {
    if dash.is_null() {
        return ptr::null_mut();
    }
    (*dash)
        .inner
        .take_notification()
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a dl_* function or null
#[no_mangle]
pub unsafe extern "C" fn dl_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
