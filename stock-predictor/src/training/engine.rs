//! Training engine.
//!
//! Builds a `[W, 2W + 1, 1]` network for a dataset of window size W and runs
//! online back-propagation until the total error drops below `max_error` or
//! `max_iterations` passes have run, whichever comes first.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{load_dataset, LoaderError};
use crate::network::{ModelArtifact, ModelError, MultiLayerPerceptron};
use crate::window::TrainingDataset;

pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_MAX_ERROR: f64 = 0.00001;
pub const DEFAULT_LEARNING_RATE: f64 = 0.5;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("invalid training parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to load training data: {0}")]
    Loader(#[from] LoaderError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Layer sizes for a window of `window_size` inputs.
pub fn topology(window_size: usize) -> [usize; 3] {
    [window_size, 2 * window_size + 1, 1]
}

/// Learning-rule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Step size of every weight update.
    pub learning_rate: f64,
    /// Upper bound on full passes over the dataset.
    pub max_iterations: usize,
    /// Training stops once the total error falls below this value.
    pub max_error: f64,
    /// Seed for weight initialisation; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_error: DEFAULT_MAX_ERROR,
            seed: None,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainingError::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_iterations == 0 {
            return Err(TrainingError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.max_error.is_finite() || self.max_error < 0.0 {
            return Err(TrainingError::InvalidParameter(format!(
                "max_error must be a non-negative number, got {}",
                self.max_error
            )));
        }
        Ok(())
    }
}

/// Observation emitted after every training iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingProgress {
    /// 1-based iteration index.
    pub iteration: usize,
    /// Mean pattern error of the iteration.
    pub total_error: f64,
}

/// What a training run produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub window_size: usize,
    pub sample_count: usize,
    pub iterations: usize,
    /// Total error of the last iteration; `None` when nothing was trained.
    pub final_error: Option<f64>,
    /// Whether the error went below `max_error` before the iteration cap.
    pub converged: bool,
}

pub struct TrainingEngine {
    params: TrainingParams,
}

impl TrainingEngine {
    pub fn new(params: TrainingParams) -> Result<Self, TrainingError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Train on `dataset` and persist the network to `artifact`.
    ///
    /// `on_progress` is called once per iteration, so at most
    /// `max_iterations` times.
    pub fn train<F>(
        &self,
        dataset: &TrainingDataset,
        artifact: &ModelArtifact,
        mut on_progress: F,
    ) -> Result<TrainingOutcome, TrainingError>
    where
        F: FnMut(TrainingProgress),
    {
        let window_size = dataset.window_size;
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut network = MultiLayerPerceptron::new(&topology(window_size), &mut rng)?;

        let mut iterations = 0;
        let mut final_error = None;
        let mut converged = false;

        if dataset.is_empty() {
            warn!(
                window_size,
                "Training dataset is empty, persisting untrained network"
            );
        } else {
            let sample_count = dataset.len() as f64;

            while iterations < self.params.max_iterations {
                let mut error_sum = 0.0;
                for sample in &dataset.samples {
                    error_sum += network.learn_pattern(
                        &sample.features,
                        &[sample.target],
                        self.params.learning_rate,
                    )?;
                }
                let total_error = error_sum / sample_count;
                iterations += 1;
                final_error = Some(total_error);

                on_progress(TrainingProgress {
                    iteration: iterations,
                    total_error,
                });

                if !total_error.is_finite() {
                    warn!(iterations, "Training error is not finite, stopping");
                    break;
                }
                if total_error < self.params.max_error {
                    converged = true;
                    break;
                }
            }
        }

        artifact.store(&network)?;

        info!(
            window_size,
            learning_rate = self.params.learning_rate,
            iterations,
            converged,
            final_error = final_error.unwrap_or(f64::NAN),
            "Training finished, model saved to {}",
            artifact.path().display()
        );

        Ok(TrainingOutcome {
            artifact: artifact.clone(),
            window_size,
            sample_count: dataset.len(),
            iterations,
            final_error,
            converged,
        })
    }

    /// Load the dataset file written by the preparation step, then train.
    pub fn train_from_file<F>(
        &self,
        dataset_path: &Path,
        window_size: usize,
        artifact: &ModelArtifact,
        on_progress: F,
    ) -> Result<TrainingOutcome, TrainingError>
    where
        F: FnMut(TrainingProgress),
    {
        let dataset = load_dataset(dataset_path, window_size)?;
        debug!(
            samples = dataset.len(),
            "Loaded training data from {}",
            dataset_path.display()
        );
        self.train(&dataset, artifact, on_progress)
    }
}
