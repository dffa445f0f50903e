//! Held-out evaluation of a trained model.

pub mod engine;

pub use engine::{Evaluation, EvaluationEngine, EvaluationError, DEFAULT_ANCHOR};
