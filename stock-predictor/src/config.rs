//! Experiment configuration.
//!
//! Loaded from TOML; every section falls back to its defaults when missing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluation::DEFAULT_ANCHOR;
use crate::training::{TrainingParams, DEFAULT_MAX_ERROR, DEFAULT_MAX_ITERATIONS};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Raw series used for fitting bounds and building training samples.
    pub training_path: PathBuf,
    /// Raw series holding the anchored evaluation window.
    pub testing_path: PathBuf,
    /// Root of per-iteration dataset files and model artifacts.
    pub work_dir: PathBuf,
    /// Destination of sweep reports.
    pub report_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            training_path: PathBuf::from("input/rawTrainingData.csv"),
            testing_path: PathBuf::from("input/rawTestingData.csv"),
            work_dir: PathBuf::from("output/runs"),
            report_dir: PathBuf::from("output/reports"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub max_iterations: usize,
    pub max_error: f64,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_error: DEFAULT_MAX_ERROR,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Learning-rule parameters for one iteration.
    pub fn params(&self, learning_rate: f64) -> TrainingParams {
        TrainingParams {
            learning_rate,
            max_iterations: self.max_iterations,
            max_error: self.max_error,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub anchor: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            anchor: DEFAULT_ANCHOR,
        }
    }
}

/// Window sizes tried at a fixed learning rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSweepConfig {
    pub window_sizes: Vec<usize>,
    pub learning_rate: f64,
}

impl Default for WindowSweepConfig {
    fn default() -> Self {
        Self {
            window_sizes: (1..=10).collect(),
            learning_rate: 0.5,
        }
    }
}

/// Learning rates tried at a fixed window size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSweepConfig {
    pub window_size: usize,
    pub learning_rates: Vec<f64>,
}

impl Default for RateSweepConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            learning_rates: (1..=10).map(|i| i as f64 / 10.0).collect(),
        }
    }
}

/// What a sweep does when one iteration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop the sweep and return the error.
    #[default]
    Abort,
    /// Record the failure and move on to the next iteration.
    Continue,
}

/// What happens when training hits the iteration cap above `max_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergencePolicy {
    /// Keep the model and flag the result as not converged.
    #[default]
    Record,
    /// Treat the iteration as failed.
    Abort,
}

/// When normalization bounds are fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Refit on the training series in every iteration.
    #[default]
    PerIteration,
    /// Fit once per sweep and reuse.
    Shared,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub on_error: ErrorPolicy,
    pub divergence: DivergencePolicy,
    pub bounds: BoundsPolicy,
    /// Run the iterations of a sweep on the rayon pool. With `on_error =
    /// "abort"`, iterations already running when one fails still finish but
    /// are not reported; iterations not yet started are skipped.
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub evaluation: EvaluationConfig,
    pub window_sweep: WindowSweepConfig,
    pub rate_sweep: RateSweepConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

impl ExperimentConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_sweep.window_sizes.contains(&0) {
            return Err(ConfigError::Invalid(
                "window_sweep.window_sizes must all be at least 1".to_string(),
            ));
        }
        if self.rate_sweep.window_size == 0 {
            return Err(ConfigError::Invalid(
                "rate_sweep.window_size must be at least 1".to_string(),
            ));
        }

        let rates = self
            .rate_sweep
            .learning_rates
            .iter()
            .chain(std::iter::once(&self.window_sweep.learning_rate));
        for &rate in rates {
            self.training
                .params(rate)
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        Ok(())
    }
}
