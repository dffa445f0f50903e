//! Input checks run before a sweep.
//!
//! Validates:
//! - Training file parses and is non-empty
//! - Training range is non-degenerate (normalization is defined)
//! - Every window size yields at least one training sample
//! - The anchored test window can be read for every window size

use std::path::{Path, PathBuf};

use crate::data::SeriesLoader;
use crate::evaluation::EvaluationEngine;
use crate::normalize::NormalizationBounds;

/// The checks run by [`SeriesIntegrity::check`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    TrainingParse,
    TrainingRange,
    TrainingSamples,
    TestWindows,
}

impl Check {
    pub fn as_str(&self) -> &'static str {
        match self {
            Check::TrainingParse => "training_parse",
            Check::TrainingRange => "training_range",
            Check::TrainingSamples => "training_samples",
            Check::TestWindows => "test_windows",
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one check. A failure always carries the offending detail.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub check: Check,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    fn ok(check: Check, message: impl Into<String>) -> Self {
        Self {
            check,
            passed: true,
            message: message.into(),
            details: None,
        }
    }

    fn failed(check: Check, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            check,
            passed: false,
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

#[derive(Debug)]
pub struct IntegrityReport {
    pub training_path: PathBuf,
    pub testing_path: PathBuf,
    pub training_points: usize,
    pub checks: Vec<CheckResult>,
}

impl IntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        format!(
            "{} ({} points) / {}: {}/{} checks passed",
            self.training_path.display(),
            self.training_points,
            self.testing_path.display(),
            passed,
            self.checks.len()
        )
    }
}

pub struct SeriesIntegrity {
    evaluator: EvaluationEngine,
    window_sizes: Vec<usize>,
}

impl SeriesIntegrity {
    pub fn new(anchor: usize, window_sizes: &[usize]) -> Self {
        let mut window_sizes = window_sizes.to_vec();
        window_sizes.sort_unstable();
        window_sizes.dedup();
        Self {
            evaluator: EvaluationEngine::new(anchor),
            window_sizes,
        }
    }

    /// Run every check. Problems are reported as failed checks, never as errors.
    pub fn check(&self, training: &Path, testing: &Path) -> IntegrityReport {
        let mut checks = Vec::new();
        let mut training_points = 0;

        match SeriesLoader::new(training).load() {
            Ok(series) => {
                training_points = series.len();
                checks.push(CheckResult::ok(
                    Check::TrainingParse,
                    format!("{} points parsed", series.len()),
                ));
                let values = series.values();
                checks.push(self.check_range(&values));
                checks.push(self.check_samples(values.len()));
            }
            Err(e) => {
                checks.push(CheckResult::failed(
                    Check::TrainingParse,
                    "Training series could not be read",
                    e.to_string(),
                ));
            }
        }

        checks.push(self.check_test_windows(testing));

        IntegrityReport {
            training_path: training.to_path_buf(),
            testing_path: testing.to_path_buf(),
            training_points,
            checks,
        }
    }

    fn check_range(&self, values: &[f64]) -> CheckResult {
        match NormalizationBounds::fit(values) {
            Ok(bounds) if bounds.is_degenerate() => CheckResult::failed(
                Check::TrainingRange,
                "Degenerate range",
                format!("every value equals {}", bounds.min),
            ),
            Ok(bounds) => CheckResult::ok(
                Check::TrainingRange,
                format!("Values span [{}, {}]", bounds.min, bounds.max),
            ),
            Err(e) => CheckResult::failed(Check::TrainingRange, "Training series is empty", e.to_string()),
        }
    }

    /// `L - W` samples per window size; zero means nothing to train on.
    fn check_samples(&self, len: usize) -> CheckResult {
        let starved: Vec<String> = self
            .window_sizes
            .iter()
            .filter(|&&w| len <= w)
            .map(|w| format!("W={}", w))
            .collect();

        if starved.is_empty() {
            CheckResult::ok(
                Check::TrainingSamples,
                format!("All {} window sizes yield training samples", self.window_sizes.len()),
            )
        } else {
            CheckResult::failed(
                Check::TrainingSamples,
                format!("{} window sizes yield no samples", starved.len()),
                starved.join(", "),
            )
        }
    }

    fn check_test_windows(&self, testing: &Path) -> CheckResult {
        let issues: Vec<String> = self
            .window_sizes
            .iter()
            .filter_map(|&w| {
                self.evaluator
                    .read_test_window(testing, w)
                    .err()
                    .map(|e| format!("W={}: {}", w, e))
            })
            .collect();

        if issues.is_empty() {
            CheckResult::ok(
                Check::TestWindows,
                format!(
                    "Anchored window at line {} readable for all window sizes",
                    self.evaluator.anchor()
                ),
            )
        } else {
            CheckResult::failed(
                Check::TestWindows,
                format!("{} window sizes cannot be evaluated", issues.len()),
                issues.join("; "),
            )
        }
    }
}
