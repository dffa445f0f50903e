//! Fully connected sigmoid layer.
//!
//! output = sigmoid(weights . input + biases)

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Initial weights and biases are drawn uniformly from `[-0.7, 0.7]`.
pub const INITIAL_WEIGHT_RANGE: f64 = 0.7;

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative expressed through the activation itself.
pub fn sigmoid_derivative(activation: f64) -> f64 {
    activation * (1.0 - activation)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix (output_size x input_size).
    pub weights: Array2<f64>,
    /// Bias vector (output_size).
    pub biases: Array1<f64>,
}

impl DenseLayer {
    pub fn new<R: Rng>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let weights = Array2::from_shape_fn((output_size, input_size), |_| {
            rng.gen_range(-INITIAL_WEIGHT_RANGE..=INITIAL_WEIGHT_RANGE)
        });
        let biases = Array1::from_shape_fn(output_size, |_| {
            rng.gen_range(-INITIAL_WEIGHT_RANGE..=INITIAL_WEIGHT_RANGE)
        });
        Self { weights, biases }
    }

    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    pub fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        (self.weights.dot(input) + &self.biases).mapv(sigmoid)
    }

    /// Error signal for the previous layer, computed before this layer's
    /// weights change.
    pub fn propagate_delta(&self, delta: &Array1<f64>, input: &Array1<f64>) -> Array1<f64> {
        let back = self.weights.t().dot(delta);
        &back * &input.mapv(sigmoid_derivative)
    }

    /// Gradient step: `w += lr * delta x input`, `b += lr * delta`.
    pub fn apply_delta(&mut self, delta: &Array1<f64>, input: &Array1<f64>, learning_rate: f64) {
        let grad = delta
            .view()
            .insert_axis(Axis(1))
            .dot(&input.view().insert_axis(Axis(0)));
        self.weights.scaled_add(learning_rate, &grad);
        self.biases.scaled_add(learning_rate, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
        assert_relative_eq!(sigmoid_derivative(0.5), 0.25);
    }

    #[test]
    fn test_layer_shapes_and_init_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = DenseLayer::new(3, 7, &mut rng);
        assert_eq!(layer.input_size(), 3);
        assert_eq!(layer.output_size(), 7);
        assert_eq!(layer.num_parameters(), 3 * 7 + 7);
        assert!(layer
            .weights
            .iter()
            .chain(layer.biases.iter())
            .all(|w| w.abs() <= INITIAL_WEIGHT_RANGE));
    }

    #[test]
    fn test_forward_known_weights() {
        let layer = DenseLayer {
            weights: array![[1.0, -1.0]],
            biases: array![0.0],
        };
        let out = layer.forward(&array![2.0, 2.0]);
        assert_relative_eq!(out[0], 0.5);
    }

    #[test]
    fn test_apply_delta_outer_product() {
        let mut layer = DenseLayer {
            weights: array![[0.0, 0.0], [0.0, 0.0]],
            biases: array![0.0, 0.0],
        };
        layer.apply_delta(&array![1.0, -2.0], &array![0.5, 0.25], 0.1);
        assert_relative_eq!(layer.weights[[0, 0]], 0.05);
        assert_relative_eq!(layer.weights[[0, 1]], 0.025);
        assert_relative_eq!(layer.weights[[1, 0]], -0.1);
        assert_relative_eq!(layer.weights[[1, 1]], -0.05);
        assert_relative_eq!(layer.biases[1], -0.2);
    }
}
