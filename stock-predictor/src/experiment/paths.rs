//! Per-iteration file layout.
//!
//! Every sweep iteration owns a directory holding its dataset file and model
//! artifact, so no two iterations write to the same path.

use std::path::{Path, PathBuf};

use crate::network::ModelArtifact;

use super::sweep::{SweepKind, SweepPoint};

pub const DATASET_FILE: &str = "learning_data.csv";
pub const MODEL_FILE: &str = "model.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationPaths {
    pub dir: PathBuf,
    pub dataset: PathBuf,
    pub artifact: ModelArtifact,
}

impl IterationPaths {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            dataset: dir.join(DATASET_FILE),
            artifact: ModelArtifact::new(dir.join(MODEL_FILE)),
            dir,
        }
    }

    /// `<work_dir>/<sweep>/<point label>/`
    pub fn for_point(work_dir: &Path, kind: SweepKind, point: &SweepPoint) -> Self {
        Self::new(work_dir.join(kind.slug()).join(point.label(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::Sweep;

    #[test]
    fn test_layout() {
        let sweep = Sweep::window_sizes(&[1, 2], 0.5);
        let paths = IterationPaths::for_point(Path::new("runs"), sweep.kind, &sweep.points[1]);
        assert_eq!(paths.dir, PathBuf::from("runs/window-size/02-w2"));
        assert_eq!(paths.dataset, PathBuf::from("runs/window-size/02-w2/learning_data.csv"));
        assert_eq!(
            paths.artifact.path(),
            Path::new("runs/window-size/02-w2/model.json")
        );
    }

    #[test]
    fn test_iterations_never_share_paths() {
        let sweep = Sweep::learning_rates(5, &[0.1, 0.2, 0.3, 0.1]);
        let dirs: std::collections::HashSet<_> = sweep
            .points
            .iter()
            .map(|p| IterationPaths::for_point(Path::new("runs"), sweep.kind, p).dir)
            .collect();
        assert_eq!(dirs.len(), 4);
    }
}
