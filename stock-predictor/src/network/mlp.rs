//! Feed-forward multilayer perceptron trained with online back-propagation.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::layer::{sigmoid_derivative, DenseLayer};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("input has {got} values, network expects {expected}")]
    InputShape { expected: usize, got: usize },

    #[error("target has {got} values, network produces {expected}")]
    TargetShape { expected: usize, got: usize },

    #[error("IO error on model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model artifact {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ModelError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Sigmoid MLP with a bias on every non-input unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLayerPerceptron {
    layer_sizes: Vec<usize>,
    layers: Vec<DenseLayer>,
}

impl MultiLayerPerceptron {
    /// Build a network with randomly initialised weights.
    ///
    /// `layer_sizes` lists the unit count of every layer, input first.
    pub fn new<R: Rng>(layer_sizes: &[usize], rng: &mut R) -> Result<Self, ModelError> {
        check_sizes(layer_sizes)?;

        let layers = layer_sizes
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], &mut *rng))
            .collect();

        Ok(Self {
            layer_sizes: layer_sizes.to_vec(),
            layers,
        })
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn input_size(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.num_parameters()).sum()
    }

    /// Activations of every layer, input included.
    fn forward_trace(&self, input: Array1<f64>) -> Vec<Array1<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input);
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1]);
            activations.push(next);
        }
        activations
    }

    fn check_input(&self, input: &[f64]) -> Result<(), ModelError> {
        if input.len() != self.input_size() {
            return Err(ModelError::InputShape {
                expected: self.input_size(),
                got: input.len(),
            });
        }
        Ok(())
    }

    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check_input(input)?;
        let mut activations = self.forward_trace(Array1::from(input.to_vec()));
        let output = activations.pop().unwrap_or_default();
        Ok(output.to_vec())
    }

    /// One forward/backward pass on a single pattern, updating weights in
    /// place. Returns the pattern error `0.5 * sum((target - output)^2)`
    /// measured before the update.
    pub fn learn_pattern(
        &mut self,
        input: &[f64],
        target: &[f64],
        learning_rate: f64,
    ) -> Result<f64, ModelError> {
        self.check_input(input)?;
        if target.len() != self.output_size() {
            return Err(ModelError::TargetShape {
                expected: self.output_size(),
                got: target.len(),
            });
        }

        let activations = self.forward_trace(Array1::from(input.to_vec()));
        let output = &activations[activations.len() - 1];
        let error = Array1::from(target.to_vec()) - output;
        let pattern_error = 0.5 * error.mapv(|e| e * e).sum();

        let mut delta = &error * &output.mapv(sigmoid_derivative);
        for idx in (0..self.layers.len()).rev() {
            let layer_input = &activations[idx];
            let next_delta = if idx > 0 {
                Some(self.layers[idx].propagate_delta(&delta, layer_input))
            } else {
                None
            };
            self.layers[idx].apply_delta(&delta, layer_input, learning_rate);
            if let Some(d) = next_delta {
                delta = d;
            }
        }

        Ok(pattern_error)
    }

    /// Write the network as JSON. The file is written beside `path` first and
    /// then renamed over it.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ModelError::io(parent, e))?;
            }
        }

        let tmp_path = path.with_extension("tmp");
        {
            let file = File::create(&tmp_path).map_err(|e| ModelError::io(&tmp_path, e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self).map_err(|e| ModelError::Format {
                path: tmp_path.clone(),
                source: e,
            })?;
            writer.flush().map_err(|e| ModelError::io(&tmp_path, e))?;
        }
        fs::rename(&tmp_path, path).map_err(|e| ModelError::io(path, e))?;

        Ok(())
    }

    /// Read a network written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|e| ModelError::io(path, e))?;
        let reader = BufReader::new(file);
        let network: Self = serde_json::from_reader(reader).map_err(|e| ModelError::Format {
            path: path.to_path_buf(),
            source: e,
        })?;
        network.check_layers()?;
        Ok(network)
    }

    fn check_layers(&self) -> Result<(), ModelError> {
        check_sizes(&self.layer_sizes)?;
        if self.layers.len() != self.layer_sizes.len() - 1 {
            return Err(ModelError::InvalidTopology(format!(
                "{} layer sizes but {} weight layers",
                self.layer_sizes.len(),
                self.layers.len()
            )));
        }
        for (idx, layer) in self.layers.iter().enumerate() {
            let expected = (self.layer_sizes[idx + 1], self.layer_sizes[idx]);
            if layer.weights.dim() != expected || layer.biases.len() != expected.0 {
                return Err(ModelError::InvalidTopology(format!(
                    "layer {} has weights {:?}, expected {:?}",
                    idx + 1,
                    layer.weights.dim(),
                    expected
                )));
            }
        }
        Ok(())
    }
}

fn check_sizes(layer_sizes: &[usize]) -> Result<(), ModelError> {
    if layer_sizes.len() < 2 {
        return Err(ModelError::InvalidTopology(
            "need at least an input and an output layer".to_string(),
        ));
    }
    if layer_sizes.contains(&0) {
        return Err(ModelError::InvalidTopology(format!(
            "layer sizes must be positive: {:?}",
            layer_sizes
        )));
    }
    Ok(())
}
