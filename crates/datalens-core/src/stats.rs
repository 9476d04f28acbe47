//! Aggregates behind the dashboard charts

use crate::highlight::{parse_score, ANOMALY_SCORE_COLUMN};
use crate::merger::MergedTable;
use crate::table::DatasetKind;
use serde::{Deserialize, Serialize};

/// Number of histogram bins over [0, 1]
pub const HISTOGRAM_BINS: usize = 10;

/// Row count for one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub name: String,
    pub value: usize,
}

/// One bar of the anomaly score histogram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBin {
    /// Range label, e.g. `0.3-0.4`
    pub name: String,
    pub threads: usize,
    pub non_threads: usize,
}

impl ScoreBin {
    pub fn total(&self) -> usize {
        self.threads + self.non_threads
    }
}

/// Everything the charts need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub source_counts: Vec<SourceCount>,
    pub score_histogram: Vec<ScoreBin>,
    pub has_anomaly_scores: bool,
}

/// Threads vs non-threads counts, skipping empty datasets
pub fn source_counts(threads: usize, non_threads: usize) -> Vec<SourceCount> {
    [
        (DatasetKind::Threads, threads),
        (DatasetKind::NonThreads, non_threads),
    ]
    .into_iter()
    .filter(|(_, value)| *value > 0)
    .map(|(kind, value)| SourceCount {
        name: kind.label().to_string(),
        value,
    })
    .collect()
}

/// Bin index for a score, or `None` when it falls outside [0, 1]
pub fn score_bin(score: f64) -> Option<usize> {
    if !(0.0..=1.0).contains(&score) {
        return None;
    }
    Some(((score * HISTOGRAM_BINS as f64).floor() as usize).min(HISTOGRAM_BINS - 1))
}

/// Histogram of `AnomalyScore` values split by dataset
pub fn score_histogram(table: &MergedTable) -> Vec<ScoreBin> {
    let mut bins: Vec<ScoreBin> = (0..HISTOGRAM_BINS)
        .map(|i| ScoreBin {
            name: format!("{:.1}-{:.1}", i as f64 * 0.1, (i + 1) as f64 * 0.1),
            threads: 0,
            non_threads: 0,
        })
        .collect();

    for row in &table.rows {
        let Some(idx) = row
            .get(ANOMALY_SCORE_COLUMN)
            .and_then(parse_score)
            .and_then(score_bin)
        else {
            continue;
        };
        match row.source {
            DatasetKind::Threads => bins[idx].threads += 1,
            DatasetKind::NonThreads => bins[idx].non_threads += 1,
        }
    }

    bins
}

/// Whether any row carries a non-empty score cell
pub fn has_anomaly_scores(table: &MergedTable) -> bool {
    table
        .rows
        .iter()
        .any(|r| r.get(ANOMALY_SCORE_COLUMN).is_some_and(|v| !v.is_empty()))
}

/// Build chart data for a merged table
pub fn chart_data(table: &MergedTable) -> ChartData {
    ChartData {
        source_counts: source_counts(
            table.count_from(DatasetKind::Threads),
            table.count_from(DatasetKind::NonThreads),
        ),
        score_histogram: score_histogram(table),
        has_anomaly_scores: has_anomaly_scores(table),
    }
}

/// "Displaying X of Y total rows."
pub fn summary_line(shown: usize, total: usize) -> String {
    format!("Displaying {} of {} total rows.", shown, total)
}
