//! Hyperparameter sweeps.
//!
//! A sweep varies one parameter (window size or learning rate) while the
//! other stays fixed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ExperimentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Vary the window size at a fixed learning rate.
    WindowSize,
    /// Vary the learning rate at a fixed window size.
    LearningRate,
}

impl SweepKind {
    /// Directory and file name stem.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::WindowSize => "window-size",
            Self::LearningRate => "learning-rate",
        }
    }

    /// Chart title for the report.
    pub fn title(&self) -> &'static str {
        match self {
            Self::WindowSize => "Sliding Window Size Variation",
            Self::LearningRate => "Learning Rate Variation",
        }
    }

    /// Name of the varied parameter.
    pub fn parameter_name(&self) -> &'static str {
        match self {
            Self::WindowSize => "window_size",
            Self::LearningRate => "learning_rate",
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One iteration of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// 0-based position in the sweep.
    pub index: usize,
    pub window_size: usize,
    pub learning_rate: f64,
    /// Value of the varied parameter, used as the x coordinate of reports.
    pub parameter_value: f64,
}

impl SweepPoint {
    /// Short label for directory names, e.g. `03-w3` or `07-lr0.7`.
    pub fn label(&self, kind: SweepKind) -> String {
        match kind {
            SweepKind::WindowSize => format!("{:02}-w{}", self.index + 1, self.window_size),
            SweepKind::LearningRate => format!("{:02}-lr{}", self.index + 1, self.learning_rate),
        }
    }
}

/// Ordered list of iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    pub kind: SweepKind,
    pub points: Vec<SweepPoint>,
}

impl Sweep {
    /// Window-size sweep at a fixed learning rate.
    pub fn window_sizes(window_sizes: &[usize], learning_rate: f64) -> Self {
        let points = window_sizes
            .iter()
            .enumerate()
            .map(|(index, &window_size)| SweepPoint {
                index,
                window_size,
                learning_rate,
                parameter_value: window_size as f64,
            })
            .collect();

        Self {
            kind: SweepKind::WindowSize,
            points,
        }
    }

    /// Learning-rate sweep at a fixed window size.
    pub fn learning_rates(window_size: usize, learning_rates: &[f64]) -> Self {
        let points = learning_rates
            .iter()
            .enumerate()
            .map(|(index, &learning_rate)| SweepPoint {
                index,
                window_size,
                learning_rate,
                parameter_value: learning_rate,
            })
            .collect();

        Self {
            kind: SweepKind::LearningRate,
            points,
        }
    }

    /// Build the configured sweep of the given kind.
    pub fn from_config(kind: SweepKind, config: &ExperimentConfig) -> Self {
        match kind {
            SweepKind::WindowSize => Self::window_sizes(
                &config.window_sweep.window_sizes,
                config.window_sweep.learning_rate,
            ),
            SweepKind::LearningRate => Self::learning_rates(
                config.rate_sweep.window_size,
                &config.rate_sweep.learning_rates,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
