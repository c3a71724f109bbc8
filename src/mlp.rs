//! Fixed-topology multilayer perceptron
//!
//! One hidden layer, one output layer, logistic activation on both. Each
//! layer keeps its weights in a single contiguous row-major buffer of
//! `units × (inputs + 1)` values; the last column of every row is the bias,
//! i.e. the weight of a constant `1` appended to the input vector.
//!
//! All buffers are statically sized and filled once by [`Mlp::configure`];
//! [`Mlp::forward`] only overwrites the layer outputs.

use heapless::Vec;

use crate::error::ConfigError;

/// Largest number of units (or inputs) a layer can have
pub const MAX_UNITS: usize = 16;
/// Largest weight matrix, bias column included
pub const MAX_WEIGHTS: usize = MAX_UNITS * (MAX_UNITS + 1);

/// Shape and weights of a trained network, usually borrowed from constants
#[derive(Debug, Clone, Copy)]
pub struct Topology<'a> {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// `hidden_size` rows of `input_size + 1` weights
    pub hidden_weights: &'a [f32],
    /// `output_size` rows of `hidden_size + 1` weights
    pub output_weights: &'a [f32],
}

/// Logistic sigmoid, saturating smoothly to (0, 1)
#[inline]
pub fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + libm::expf(-z))
}

struct Layer {
    inputs: usize,
    weights: Vec<f32, MAX_WEIGHTS>,
    outputs: Vec<f32, MAX_UNITS>,
}

impl Layer {
    fn new(
        layer: &'static str,
        inputs: usize,
        units: usize,
        weights: &[f32],
    ) -> Result<Self, ConfigError> {
        if inputs == 0 || units == 0 {
            return Err(ConfigError::ZeroDimension { layer });
        }

        if inputs > MAX_UNITS || units > MAX_UNITS {
            return Err(ConfigError::CapacityExceeded {
                layer,
                required: inputs.max(units),
                available: MAX_UNITS,
            });
        }

        let expected = units * (inputs + 1);
        if weights.len() != expected {
            return Err(ConfigError::WeightCount { layer, expected, actual: weights.len() });
        }

        let mut layer_weights = Vec::new();
        layer_weights
            .extend_from_slice(weights)
            .map_err(|_| ConfigError::CapacityExceeded {
                layer,
                required: expected,
                available: MAX_WEIGHTS,
            })?;

        let mut outputs = Vec::new();
        outputs
            .resize(units, 0.0)
            .map_err(|_| ConfigError::CapacityExceeded {
                layer,
                required: units,
                available: MAX_UNITS,
            })?;

        Ok(Self { inputs, weights: layer_weights, outputs })
    }

    fn propagate(&mut self, input: &[f32]) {
        let stride = self.inputs + 1;
        for (row, out) in self.weights.chunks_exact(stride).zip(self.outputs.iter_mut()) {
            let (weights, bias) = row.split_at(self.inputs);
            let z = weights
                .iter()
                .zip(input)
                .fold(bias[0], |acc, (w, x)| acc + w * x);
            *out = sigmoid(z);
        }
    }
}

/// A configured network, ready for inference
pub struct Mlp {
    hidden: Layer,
    output: Layer,
}

impl Mlp {
    /// Install the weights of `topology` and size the output buffers
    pub fn configure(topology: &Topology<'_>) -> Result<Self, ConfigError> {
        let hidden = Layer::new(
            "hidden",
            topology.input_size,
            topology.hidden_size,
            topology.hidden_weights,
        )?;
        let output = Layer::new(
            "output",
            topology.hidden_size,
            topology.output_size,
            topology.output_weights,
        )?;

        Ok(Self { hidden, output })
    }

    pub fn input_size(&self) -> usize {
        self.hidden.inputs
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden.outputs.len()
    }

    pub fn output_size(&self) -> usize {
        self.output.outputs.len()
    }

    /// Run the network on `input`.
    ///
    /// The returned slice is the output layer buffer and stays valid until
    /// the next call.
    ///
    /// # Panics
    ///
    /// If `input.len()` differs from the configured input size.
    pub fn forward(&mut self, input: &[f32]) -> &[f32] {
        assert_eq!(
            input.len(),
            self.hidden.inputs,
            "input vector does not match the network's input size"
        );

        self.hidden.propagate(input);
        self.output.propagate(&self.hidden.outputs);
        &self.output.outputs
    }

    /// Hidden layer activations from the last `forward`
    pub fn hidden_outputs(&self) -> &[f32] {
        &self.hidden.outputs
    }

    /// Output layer activations from the last `forward`
    pub fn outputs(&self) -> &[f32] {
        &self.output.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIDDEN: [f32; 6] = [
        0.5, -0.25, 0.1, // unit 0
        -1.0, 2.0, -0.3, // unit 1
    ];
    const OUTPUT: [f32; 3] = [1.5, -0.75, 0.2];

    fn small() -> Mlp {
        Mlp::configure(&Topology {
            input_size: 2,
            hidden_size: 2,
            output_size: 1,
            hidden_weights: &HIDDEN,
            output_weights: &OUTPUT,
        })
        .unwrap()
    }

    #[test]
    fn test_sigmoid_shape() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
        assert!(sigmoid(1.0) > sigmoid(0.5));
    }

    #[test]
    fn test_forward_matches_hand_computation() {
        let mut mlp = small();
        let x = [0.2, 0.8];

        let h0 = sigmoid(0.1 + 0.5 * 0.2 - 0.25 * 0.8);
        let h1 = sigmoid(-0.3 - 1.0 * 0.2 + 2.0 * 0.8);
        let expected = sigmoid(0.2 + 1.5 * h0 - 0.75 * h1);

        let out = mlp.forward(&x);
        assert_eq!(out.len(), 1);
        assert!((out[0] - expected).abs() < 1e-6);
        assert!((mlp.hidden_outputs()[0] - h0).abs() < 1e-6);
        assert!((mlp.hidden_outputs()[1] - h1).abs() < 1e-6);
    }

    #[test]
    fn test_bias_is_last_column() {
        // All input weights zero: the output is the sigmoid of the bias alone
        let hidden = [0.0, 0.0, 3.0];
        let output = [0.0, -2.0];
        let mut mlp = Mlp::configure(&Topology {
            input_size: 2,
            hidden_size: 1,
            output_size: 1,
            hidden_weights: &hidden,
            output_weights: &output,
        })
        .unwrap();

        mlp.forward(&[100.0, -100.0]);
        assert_eq!(mlp.hidden_outputs()[0], sigmoid(3.0));
        assert_eq!(mlp.outputs()[0], sigmoid(-2.0));
    }

    #[test]
    fn test_forward_is_deterministic() {
        let mut mlp = small();
        let first = mlp.forward(&[0.37, -1.2])[0];
        mlp.forward(&[5.0, 5.0]);
        let second = mlp.forward(&[0.37, -1.2])[0];
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_dimensions() {
        let mlp = small();
        assert_eq!(mlp.input_size(), 2);
        assert_eq!(mlp.hidden_size(), 2);
        assert_eq!(mlp.output_size(), 1);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let result = Mlp::configure(&Topology {
            input_size: 2,
            hidden_size: 0,
            output_size: 1,
            hidden_weights: &[],
            output_weights: &[0.0],
        });
        assert!(matches!(result, Err(ConfigError::ZeroDimension { layer: "hidden" })));
    }

    #[test]
    fn test_weight_count_mismatch_rejected() {
        let result = Mlp::configure(&Topology {
            input_size: 2,
            hidden_size: 2,
            output_size: 1,
            hidden_weights: &HIDDEN[..5],
            output_weights: &OUTPUT,
        });
        assert_eq!(
            result.err(),
            Some(ConfigError::WeightCount { layer: "hidden", expected: 6, actual: 5 })
        );
    }

    #[test]
    fn test_capacity_exceeded_rejected() {
        let weights = [0.0; MAX_WEIGHTS];
        let result = Mlp::configure(&Topology {
            input_size: MAX_UNITS + 1,
            hidden_size: 1,
            output_size: 1,
            hidden_weights: &weights[..MAX_UNITS + 2],
            output_weights: &[0.0, 0.0],
        });
        assert!(matches!(result, Err(ConfigError::CapacityExceeded { .. })));
    }

    #[test]
    #[should_panic(expected = "input vector")]
    fn test_wrong_input_length_panics() {
        let mut mlp = small();
        mlp.forward(&[1.0, 2.0, 3.0]);
    }
}
