//! CSV and JSON output for sweep reports.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::experiment::{ExperimentResult, IterationFailure, SweepKind, SweepReport};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// JSON document written next to the series CSV.
#[derive(Debug, Serialize)]
pub struct SweepSummary<'a> {
    pub generated_at: String,
    pub sweep: SweepKind,
    pub title: &'static str,
    pub parameter: &'static str,
    pub best: Option<&'a ExperimentResult>,
    pub mean_squared_error: Option<f64>,
    pub unconverged: usize,
    pub results: &'a [ExperimentResult],
    pub failures: &'a [IterationFailure],
}

impl<'a> SweepSummary<'a> {
    pub fn new(report: &'a SweepReport) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            sweep: report.kind,
            title: report.kind.title(),
            parameter: report.kind.parameter_name(),
            best: report.best(),
            mean_squared_error: report.mean_squared_error(),
            unconverged: report.unconverged_count(),
            results: &report.results,
            failures: &report.failures,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SeriesRow {
    parameter: f64,
    squared_error: f64,
}

/// Write the `(parameter, squared error)` series, one record per result.
pub fn write_series_csv(report: &SweepReport, path: &Path) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    for (parameter, squared_error) in report.series() {
        writer.serialize(SeriesRow {
            parameter,
            squared_error,
        })?;
    }
    if report.results.is_empty() {
        writer.write_record(["parameter", "squared_error"])?;
    }
    writer.flush().map_err(|e| ReportError::io(path, e))
}

/// Write the JSON summary of a sweep.
pub fn write_summary_json(report: &SweepReport, path: &Path) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(&SweepSummary::new(report))?;
    fs::write(path, content).map_err(|e| ReportError::io(path, e))
}

/// Write `<slug>.csv` and `<slug>.json` into `dir`, returning both paths.
pub fn write_report(report: &SweepReport, dir: &Path) -> Result<(PathBuf, PathBuf), ReportError> {
    let csv_path = dir.join(format!("{}.csv", report.kind.slug()));
    let json_path = dir.join(format!("{}.json", report.kind.slug()));
    write_series_csv(report, &csv_path)?;
    write_summary_json(report, &json_path)?;
    Ok((csv_path, json_path))
}
