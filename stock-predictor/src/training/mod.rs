//! Supervised training of the window regressor.

pub mod engine;

pub use engine::{
    topology, TrainingEngine, TrainingError, TrainingOutcome, TrainingParams, TrainingProgress,
    DEFAULT_LEARNING_RATE, DEFAULT_MAX_ERROR, DEFAULT_MAX_ITERATIONS,
};
