//! Core data types for raw price series.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One line of a raw series file: the label column and the observed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Index or timestamp exactly as written in the first column.
    pub label: String,
    /// Observed value (second column).
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Ordered raw series loaded from a single file.
#[derive(Debug, Clone, Default)]
pub struct RawSeries {
    /// File the series was read from (empty for in-memory series).
    pub source: PathBuf,
    /// Points in file order.
    pub points: Vec<SeriesPoint>,
}

impl RawSeries {
    /// Create a series from points, with no backing file.
    pub fn from_points(points: Vec<SeriesPoint>) -> Self {
        Self {
            source: PathBuf::new(),
            points,
        }
    }

    pub fn with_source(mut self, source: &Path) -> Self {
        self.source = source.to_path_buf();
        self
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Values in file order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}
