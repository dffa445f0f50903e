//! Sweep report output.

pub mod writer;

pub use writer::{
    write_report, write_series_csv, write_summary_json, ReportError, SweepSummary,
};
