//! Feed-forward regressor used by the training and evaluation engines.
//!
//! Sigmoid units throughout, so targets and outputs live in `(0, 1)`; the
//! `[0.1, 0.9]` normalization band keeps targets away from saturation.

pub mod artifact;
pub mod layer;
pub mod mlp;

pub use artifact::ModelArtifact;
pub use layer::{sigmoid, DenseLayer};
pub use mlp::{ModelError, MultiLayerPerceptron};
