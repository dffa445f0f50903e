//! Validation of experiment inputs.

pub mod series_integrity;

pub use series_integrity::{Check, CheckResult, IntegrityReport, SeriesIntegrity};
