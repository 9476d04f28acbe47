//! Anomaly highlighting for merged rows
//!
//! Classifications are computed over the whole merged dataset, never the
//! filtered view, and looked up by [`RowKey`] when a page is rendered.

use crate::error::{Error, Result};
use crate::merger::{CombinedRow, RowKey};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Column holding the anomaly score
pub const ANOMALY_SCORE_COLUMN: &str = "AnomalyScore";

/// Scores above this are anomalous
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Highlight for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Anomalous
    Red,
    /// Scored and not anomalous
    Green,
    #[default]
    None,
}

impl Classification {
    /// Boolean form: only red rows are highlighted
    pub fn is_highlighted(self) -> bool {
        matches!(self, Classification::Red)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Red => "red",
            Classification::Green => "green",
            Classification::None => "none",
        }
    }
}

impl From<bool> for Classification {
    fn from(flag: bool) -> Self {
        if flag {
            Classification::Red
        } else {
            Classification::None
        }
    }
}

// Remote classifiers answer with either the named form or a plain boolean.
impl<'de> Deserialize<'de> for Classification {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Flag(bool),
            Name(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Flag(flag) => Ok(flag.into()),
            Wire::Name(name) => match name.to_ascii_lowercase().as_str() {
                "red" => Ok(Classification::Red),
                "green" => Ok(Classification::Green),
                "none" => Ok(Classification::None),
                other => Err(serde::de::Error::unknown_variant(
                    other,
                    &["red", "green", "none"],
                )),
            },
        }
    }
}

/// Classify a single score cell against a threshold
pub fn classify_score(cell: Option<&str>, threshold: f64) -> Classification {
    let Some(score) = cell.and_then(parse_score) else {
        return Classification::None;
    };
    if score > threshold {
        Classification::Red
    } else {
        Classification::Green
    }
}

/// Parse an anomaly score; NaN and non-numbers are `None`
pub fn parse_score(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|s| !s.is_nan())
}

/// Something that classifies merged rows
pub trait Highlighter {
    /// One classification per input row, in order
    fn classify(&self, rows: &[CombinedRow], enabled: bool) -> Result<Vec<Classification>>;
}

/// Classifies rows by comparing a score column to a threshold
#[derive(Debug, Clone)]
pub struct ScoreThreshold {
    pub column: String,
    pub threshold: f64,
}

impl Default for ScoreThreshold {
    fn default() -> Self {
        Self {
            column: ANOMALY_SCORE_COLUMN.to_string(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScoreThreshold {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

impl Highlighter for ScoreThreshold {
    fn classify(&self, rows: &[CombinedRow], enabled: bool) -> Result<Vec<Classification>> {
        if !enabled {
            return Ok(vec![Classification::None; rows.len()]);
        }
        Ok(rows
            .iter()
            .map(|row| classify_score(row.get(&self.column), self.threshold))
            .collect())
    }
}

/// Classifications indexed by row key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightMap {
    by_key: HashMap<RowKey, Classification>,
}

impl HighlightMap {
    /// Pair a classifier's parallel output with the rows it was given
    pub fn from_parallel(rows: &[CombinedRow], classes: Vec<Classification>) -> Result<Self> {
        if classes.len() != rows.len() {
            return Err(Error::HighlightLengthMismatch {
                expected: rows.len(),
                found: classes.len(),
            });
        }
        let by_key = rows.iter().map(|r| r.key).zip(classes).collect();
        Ok(Self { by_key })
    }

    /// Run a highlighter over the merged rows
    pub fn compute(
        highlighter: &dyn Highlighter,
        rows: &[CombinedRow],
        enabled: bool,
    ) -> Result<Self> {
        if !enabled || rows.is_empty() {
            return Ok(Self::default());
        }
        let classes = highlighter.classify(rows, enabled)?;
        Self::from_parallel(rows, classes)
    }

    /// Classification for a row; unknown keys are `None`
    pub fn get(&self, key: RowKey) -> Classification {
        self.by_key.get(&key).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Number of rows with a given classification
    pub fn count(&self, class: Classification) -> usize {
        self.by_key.values().filter(|c| **c == class).count()
    }
}
