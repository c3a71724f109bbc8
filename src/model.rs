//! The trained environment model
//!
//! Weights and normalization bounds come from offline training and are
//! compiled in. Inputs are temperature (°C), humidity (%), gas proxy and
//! light (lux), in that order; the single sigmoid output is scaled to a
//! 0-100 score.

use crate::config::{HIDDEN_LAYER_LEN, INPUT_LAYER_LEN, OUTPUT_LAYER_LEN};
use crate::error::ConfigError;
use crate::mlp::{Mlp, Topology};
use crate::normalize::{normalize, NormalizationBounds};
use crate::reading::RawSample;

/// Minimum of each input feature in the training set
pub const FEATURE_MIN: [f32; INPUT_LAYER_LEN] = [5.793664, 20.596113, 9.414636, 160.582703];
/// Maximum of each input feature in the training set
pub const FEATURE_MAX: [f32; INPUT_LAYER_LEN] = [41.263657, 81.931076, 217.787125, 1086.463989];

#[rustfmt::skip]
pub const HIDDEN_LAYER_WEIGHTS: [f32; HIDDEN_LAYER_LEN * (INPUT_LAYER_LEN + 1)] = [
    -0.602525, -0.057686, -0.267446, -3.711378,  0.448500,
     0.179523,  1.331844, -0.373048,  0.562266, -0.152008,
     0.042265, -3.133777,  0.206005,  0.452716,  1.117836,
     6.563734, -0.047519, -0.127718,  0.279491, -4.153003,
    -0.059122,  0.405526, -0.397460, -0.176535,  0.472396,
     1.645131,  0.127165,  0.404172, -2.753453,  1.723942,
    -0.021187,  0.583820,  0.534648,  0.310444,  0.906271,
     0.422764,  0.320140,  0.575352,  0.593663,  0.178238,
    -0.304632,  0.353708, -0.144588, -0.147737,  0.855667,
     4.430942, -0.881249, -0.258215,  0.186538, -1.514328,
];

#[rustfmt::skip]
pub const OUTPUT_LAYER_WEIGHTS: [f32; OUTPUT_LAYER_LEN * (HIDDEN_LAYER_LEN + 1)] = [
    -2.507177, 0.432395, -1.575119, -3.147566, 0.194103, 2.344924,
    -0.599903, -0.117070, 0.138718, 2.783273, -0.512408,
];

/// Shape of the trained network
pub const TOPOLOGY: Topology<'static> = Topology {
    input_size: INPUT_LAYER_LEN,
    hidden_size: HIDDEN_LAYER_LEN,
    output_size: OUTPUT_LAYER_LEN,
    hidden_weights: &HIDDEN_LAYER_WEIGHTS,
    output_weights: &OUTPUT_LAYER_WEIGHTS,
};

/// Normalizer and network together: raw sample in, score out
pub struct EnvironmentModel {
    mlp: Mlp,
    bounds: [NormalizationBounds; INPUT_LAYER_LEN],
}

impl EnvironmentModel {
    /// Load the compiled-in model
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_topology(&TOPOLOGY, &FEATURE_MIN, &FEATURE_MAX)
    }

    /// Load a model from explicit weights and bounds
    pub fn with_topology(
        topology: &Topology<'_>,
        min: &[f32; INPUT_LAYER_LEN],
        max: &[f32; INPUT_LAYER_LEN],
    ) -> Result<Self, ConfigError> {
        let mlp = Mlp::configure(topology)?;
        if mlp.input_size() != INPUT_LAYER_LEN {
            return Err(ConfigError::WeightCount {
                layer: "input",
                expected: INPUT_LAYER_LEN,
                actual: mlp.input_size(),
            });
        }

        let mut bounds = [NormalizationBounds::new(0.0, 1.0)?; INPUT_LAYER_LEN];
        for ((bound, lo), hi) in bounds.iter_mut().zip(min).zip(max) {
            *bound = NormalizationBounds::new(*lo, *hi)?;
        }

        Ok(Self { mlp, bounds })
    }

    pub fn bounds(&self) -> &[NormalizationBounds; INPUT_LAYER_LEN] {
        &self.bounds
    }

    /// Composite environment score for `sample`, 0-100
    pub fn score(&mut self, sample: &RawSample) -> f32 {
        let input = normalize(&sample.features(), &self.bounds);
        self.mlp.forward(&input)[0] * 100.0
    }
}
