//! Single held-out prediction at a fixed anchor.
//!
//! The test window is located by skipping `anchor - W - 1` lines of the raw
//! test file and reading the next `W + 1`. The skip count depends on W, so
//! each window size is evaluated against a different absolute position in
//! the file: with the default anchor of 63 the target is line 63 for every W,
//! while the inputs start at line `63 - W`. Keep the formula as is; changing
//! it changes which point every sweep iteration is scored on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::{LoaderError, SeriesLoader};
use crate::network::{ModelArtifact, ModelError, MultiLayerPerceptron};
use crate::normalize::{NormalizationBounds, NormalizationError};

pub const DEFAULT_ANCHOR: usize = 63;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("window size must be at least 1")]
    ZeroWindow,

    #[error(
        "insufficient test data in {path}: anchor {anchor} with window size {window_size} needs {needed} lines, found {available}"
    )]
    InsufficientData {
        path: PathBuf,
        anchor: usize,
        window_size: usize,
        needed: usize,
        available: usize,
    },

    #[error("model {path} expects {expected} inputs but the evaluation window has {window_size}")]
    WindowMismatch {
        path: PathBuf,
        expected: usize,
        window_size: usize,
    },

    #[error("failed to read test data: {0}")]
    Loader(#[from] LoaderError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("normalization error: {0}")]
    Normalization(#[from] NormalizationError),
}

/// Outcome of scoring one model on the anchored test window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub window_size: usize,
    /// Raw lines skipped before the window.
    pub skipped_lines: usize,
    /// Normalized network inputs.
    pub inputs: Vec<f64>,
    /// Denormalized network output.
    pub predicted: f64,
    /// Raw value following the inputs.
    pub actual: f64,
    /// `(actual - predicted)^2`
    pub squared_error: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationEngine {
    anchor: usize,
}

impl Default for EvaluationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ANCHOR)
    }
}

impl EvaluationEngine {
    pub fn new(anchor: usize) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// Lines skipped before the window: `anchor - W - 1`, or 0 when the
    /// window is wider than the anchor allows.
    pub fn skip_count(&self, window_size: usize) -> usize {
        self.anchor.saturating_sub(window_size + 1)
    }

    /// Lines the test file must have for window size `W`.
    pub fn required_lines(&self, window_size: usize) -> usize {
        self.skip_count(window_size) + window_size + 1
    }

    /// Read the `W + 1` raw values of the anchored window.
    pub fn read_test_window(
        &self,
        test_path: &Path,
        window_size: usize,
    ) -> Result<(usize, Vec<f64>), EvaluationError> {
        if window_size == 0 {
            return Err(EvaluationError::ZeroWindow);
        }

        let skip = self.skip_count(window_size);
        let window = SeriesLoader::new(test_path).read_window(skip, window_size + 1)?;

        if window.values.len() < window_size + 1 {
            return Err(EvaluationError::InsufficientData {
                path: test_path.to_path_buf(),
                anchor: self.anchor,
                window_size,
                needed: self.required_lines(window_size),
                available: window.records_consumed,
            });
        }

        Ok((skip, window.values))
    }

    /// Score an already loaded network on raw window values (`W` inputs
    /// followed by the actual value).
    pub fn score(
        &self,
        network: &MultiLayerPerceptron,
        raw_window: &[f64],
        bounds: &NormalizationBounds,
    ) -> Result<Evaluation, EvaluationError> {
        let window_size = raw_window.len().saturating_sub(1);
        if window_size == 0 {
            return Err(EvaluationError::ZeroWindow);
        }

        let inputs = bounds.normalize_all(&raw_window[..window_size])?;
        let actual = raw_window[window_size];

        let output = network.predict(&inputs)?;
        let predicted = bounds.denormalize(output[0]);
        let squared_error = (actual - predicted) * (actual - predicted);

        Ok(Evaluation {
            window_size,
            skipped_lines: 0,
            inputs,
            predicted,
            actual,
            squared_error,
        })
    }

    /// Load the model behind `artifact` and score it on the anchored window
    /// of `test_path`, normalizing inputs with the training bounds.
    pub fn evaluate(
        &self,
        artifact: &ModelArtifact,
        test_path: &Path,
        window_size: usize,
        bounds: &NormalizationBounds,
    ) -> Result<Evaluation, EvaluationError> {
        let (skipped_lines, raw_window) = self.read_test_window(test_path, window_size)?;

        let network = artifact.load()?;
        if network.input_size() != window_size {
            return Err(EvaluationError::WindowMismatch {
                path: artifact.path().to_path_buf(),
                expected: network.input_size(),
                window_size,
            });
        }

        let mut evaluation = self.score(&network, &raw_window, bounds)?;
        evaluation.skipped_lines = skipped_lines;

        debug!(
            window_size,
            skipped_lines,
            expected = evaluation.actual,
            predicted = evaluation.predicted,
            squared_error = evaluation.squared_error,
            "Evaluated model"
        );

        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::tempdir;

    fn write_series(path: &Path, len: usize) {
        let content: String = (0..len)
            .map(|i| format!("{},{}\n", i, 100.0 + i as f64))
            .collect();
        fs::write(path, content).unwrap();
    }

    fn store_network(path: &Path, window_size: usize) -> ModelArtifact {
        let mut rng = StdRng::seed_from_u64(5);
        let network =
            MultiLayerPerceptron::new(&[window_size, 2 * window_size + 1, 1], &mut rng).unwrap();
        let artifact = ModelArtifact::new(path);
        artifact.store(&network).unwrap();
        artifact
    }

    #[test]
    fn test_skip_count_for_window_five() {
        let engine = EvaluationEngine::default();
        assert_eq!(engine.anchor(), 63);
        assert_eq!(engine.skip_count(5), 57);
        assert_eq!(engine.required_lines(5), 63);
    }

    #[test]
    fn test_skip_count_saturates() {
        let engine = EvaluationEngine::new(5);
        assert_eq!(engine.skip_count(4), 0);
        assert_eq!(engine.skip_count(10), 0);
        assert_eq!(engine.required_lines(10), 11);
    }

    #[test]
    fn test_window_position_depends_on_window_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");
        write_series(&path, 80);
        let engine = EvaluationEngine::default();

        for w in 1..=10 {
            let (skipped, values) = engine.read_test_window(&path, w).unwrap();
            assert_eq!(skipped, 63 - w - 1);
            assert_eq!(values.len(), w + 1);
            // line n (1-based) holds 100 + (n - 1)
            assert_eq!(values[0], 100.0 + skipped as f64);
            assert_eq!(*values.last().unwrap(), 100.0 + 62.0);
        }
    }

    #[test]
    fn test_insufficient_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        write_series(&path, 60);
        let engine = EvaluationEngine::default();

        let err = engine.read_test_window(&path, 5).unwrap_err();
        match err {
            EvaluationError::InsufficientData {
                anchor,
                window_size,
                needed,
                available,
                ..
            } => {
                assert_eq!(anchor, 63);
                assert_eq!(window_size, 5);
                assert_eq!(needed, 63);
                assert_eq!(available, 60);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_evaluate_computes_squared_error() {
        let dir = tempdir().unwrap();
        let test_path = dir.path().join("test.csv");
        write_series(&test_path, 70);
        let artifact = store_network(&dir.path().join("model.json"), 5);
        let bounds = NormalizationBounds { min: 100.0, max: 180.0 };

        let evaluation = EvaluationEngine::default()
            .evaluate(&artifact, &test_path, 5, &bounds)
            .unwrap();

        assert_eq!(evaluation.skipped_lines, 57);
        assert_eq!(evaluation.actual, 162.0);
        assert_eq!(evaluation.inputs.len(), 5);
        assert_relative_eq!(evaluation.inputs[0], bounds.normalize(157.0).unwrap());
        // sigmoid output lies in (0, 1), so the prediction stays inside the
        // denormalized image of that interval
        assert!(evaluation.predicted > bounds.denormalize(0.0));
        assert!(evaluation.predicted < bounds.denormalize(1.0));
        assert_relative_eq!(
            evaluation.squared_error,
            (evaluation.actual - evaluation.predicted).powi(2),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_evaluate_rejects_mismatched_model() {
        let dir = tempdir().unwrap();
        let test_path = dir.path().join("test.csv");
        write_series(&test_path, 70);
        let artifact = store_network(&dir.path().join("model.json"), 3);
        let bounds = NormalizationBounds { min: 100.0, max: 180.0 };

        let err = EvaluationEngine::default()
            .evaluate(&artifact, &test_path, 5, &bounds)
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::WindowMismatch { expected: 3, window_size: 5, .. }
        ));
    }

    #[test]
    fn test_degenerate_bounds_fail() {
        let mut rng = StdRng::seed_from_u64(5);
        let network = MultiLayerPerceptron::new(&[2, 5, 1], &mut rng).unwrap();
        let bounds = NormalizationBounds { min: 5.0, max: 5.0 };

        let err = EvaluationEngine::default()
            .score(&network, &[5.0, 5.0, 5.0], &bounds)
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Normalization(NormalizationError::DegenerateRange { .. })
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let engine = EvaluationEngine::default();
        assert!(matches!(
            engine.read_test_window(Path::new("unused.csv"), 0),
            Err(EvaluationError::ZeroWindow)
        ));
    }
}
