//! Min-max normalization into the `[0.1, 0.9]` band used by the network.
//!
//! Bounds are fitted on a raw series and reused to normalize network inputs
//! and to map network outputs back to raw units.

pub mod bounds;

pub use bounds::{NormalizationBounds, NormalizationError, TARGET_MAX, TARGET_MIN};
