//! Min/max feature scaling into the range the network was trained on.

use crate::error::ConfigError;

/// Observed training range of one input feature
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NormalizationBounds {
    min: f32,
    max: f32,
}

impl NormalizationBounds {
    /// Bounds with `max > min`; anything else would divide by a
    /// non-positive span
    pub fn new(min: f32, max: f32) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite()) || max <= min {
            return Err(ConfigError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Scale a single value. Values outside the training range land
    /// outside [0, 1] on purpose; the network saturates them.
    #[inline]
    pub fn scale(&self, raw: f32) -> f32 {
        (raw - self.min) / (self.max - self.min)
    }
}

/// Scale every feature with its own bounds
pub fn normalize<const N: usize>(raw: &[f32; N], bounds: &[NormalizationBounds; N]) -> [f32; N] {
    let mut scaled = [0.0; N];
    for ((out, value), bound) in scaled.iter_mut().zip(raw).zip(bounds) {
        *out = bound.scale(*value);
    }
    scaled
}
