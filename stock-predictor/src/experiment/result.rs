//! Sweep results and aggregation.

use serde::{Deserialize, Serialize};

use super::sweep::SweepKind;

/// Outcome of one prepare/train/evaluate cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Value of the varied parameter (window size or learning rate).
    pub parameter_value: f64,
    /// `(actual - predicted)^2` on the anchored test window.
    pub squared_error: f64,
    pub window_size: usize,
    pub learning_rate: f64,
    pub predicted: f64,
    pub actual: f64,
    /// Training iterations actually run.
    pub iterations: usize,
    pub final_training_error: Option<f64>,
    /// False when training hit the iteration cap above `max_error`.
    pub converged: bool,
}

/// An iteration that failed under the `continue` error policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationFailure {
    pub index: usize,
    pub parameter_value: f64,
    pub window_size: usize,
    pub learning_rate: f64,
    pub error: String,
}

/// Everything a sweep produced, in iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub kind: SweepKind,
    pub results: Vec<ExperimentResult>,
    pub failures: Vec<IterationFailure>,
}

impl SweepReport {
    pub fn new(kind: SweepKind) -> Self {
        Self {
            kind,
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// `(parameter, squared error)` pairs for plotting.
    pub fn series(&self) -> Vec<(f64, f64)> {
        self.results
            .iter()
            .map(|r| (r.parameter_value, r.squared_error))
            .collect()
    }

    /// Result with the smallest squared error. NaN errors never win.
    pub fn best(&self) -> Option<&ExperimentResult> {
        self.results
            .iter()
            .filter(|r| !r.squared_error.is_nan())
            .min_by(|a, b| {
                a.squared_error
                    .partial_cmp(&b.squared_error)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Mean squared error across successful iterations.
    pub fn mean_squared_error(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        Some(self.results.iter().map(|r| r.squared_error).sum::<f64>() / self.results.len() as f64)
    }

    /// Number of results whose training did not converge.
    pub fn unconverged_count(&self) -> usize {
        self.results.iter().filter(|r| !r.converged).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable table.
    pub fn summary(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("=== {} ===\n", self.kind.title()));
        out.push_str(&format!(
            "| {:>13} | {:>6} | {:>5} | {:>12} | {:>12} | {:>14} | {:>5} | {:>9} |\n",
            self.kind.parameter_name(),
            "window",
            "rate",
            "actual",
            "predicted",
            "squared error",
            "iters",
            "converged"
        ));
        out.push_str(&format!("|{}|\n", "-".repeat(98)));

        for r in &self.results {
            out.push_str(&format!(
                "| {:>13} | {:>6} | {:>5.2} | {:>12.4} | {:>12.4} | {:>14.6} | {:>5} | {:>9} |\n",
                r.parameter_value,
                r.window_size,
                r.learning_rate,
                r.actual,
                r.predicted,
                r.squared_error,
                r.iterations,
                if r.converged { "yes" } else { "no" }
            ));
        }
        out.push('\n');

        if let Some(best) = self.best() {
            out.push_str(&format!(
                "Best {}: {} (squared error {:.6})\n",
                self.kind.parameter_name(),
                best.parameter_value,
                best.squared_error
            ));
        }
        if let Some(mean) = self.mean_squared_error() {
            out.push_str(&format!("Mean squared error: {:.6}\n", mean));
        }
        let unconverged = self.unconverged_count();
        if unconverged > 0 {
            out.push_str(&format!(
                "WARNING: {} of {} models stopped at the iteration cap\n",
                unconverged,
                self.results.len()
            ));
        }
        for failure in &self.failures {
            out.push_str(&format!(
                "FAILED {} = {}: {}\n",
                self.kind.parameter_name(),
                failure.parameter_value,
                failure.error
            ));
        }

        out
    }
}
