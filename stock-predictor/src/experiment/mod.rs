//! Hyperparameter experiments.
//!
//! Each iteration of a sweep runs a full cycle:
//! - Prepare: fit bounds on the training series, build sliding-window samples
//!   and write them to the iteration's dataset file
//! - Train: fit a fresh network from that file and store the model artifact
//! - Evaluate: score the artifact on the anchored test window

pub mod orchestrator;
pub mod paths;
pub mod result;
pub mod sweep;

pub use orchestrator::{CycleError, CycleOutcome, ExperimentError, ExperimentOrchestrator};
pub use paths::{IterationPaths, DATASET_FILE, MODEL_FILE};
pub use result::{ExperimentResult, IterationFailure, SweepReport};
pub use sweep::{Sweep, SweepKind, SweepPoint};
