//! Handle to a persisted network.

use std::path::{Path, PathBuf};

use super::mlp::{ModelError, MultiLayerPerceptron};

/// Location of one trained model. Passed explicitly from the training
/// engine to the evaluation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    path: PathBuf,
}

impl ModelArtifact {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist `network`, replacing whatever the artifact held before.
    pub fn store(&self, network: &MultiLayerPerceptron) -> Result<(), ModelError> {
        network.save(&self.path)
    }

    pub fn load(&self) -> Result<MultiLayerPerceptron, ModelError> {
        MultiLayerPerceptron::load(&self.path)
    }
}
