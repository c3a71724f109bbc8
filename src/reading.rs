//! Sensor values as they travel through the link.

/// One set of raw sensor values, before the model runs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Air temperature in °C
    pub temperature: f32,
    /// Relative humidity in %
    pub humidity: f32,
    /// Illuminance in lux
    pub light: f32,
    /// Gas proxy in ppm-like units
    pub gas: f32,
}

impl RawSample {
    /// Model input vector, in the order the network was trained on:
    /// temperature, humidity, gas, light
    pub fn features(&self) -> [f32; 4] {
        [self.temperature, self.humidity, self.gas, self.light]
    }
}

/// A complete reading as transmitted and received.
///
/// Never mutated: every cycle produces a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
    pub light: f32,
    pub gas: f32,
    /// Composite environment score, 0-100
    pub environment_score: f32,
}

impl SensorReading {
    /// All-zero reading, usable in `const` context
    pub const ZERO: Self = Self {
        temperature: 0.0,
        humidity: 0.0,
        light: 0.0,
        gas: 0.0,
        environment_score: 0.0,
    };

    pub fn new(sample: RawSample, environment_score: f32) -> Self {
        Self {
            temperature: sample.temperature,
            humidity: sample.humidity,
            light: sample.light,
            gas: sample.gas,
            environment_score,
        }
    }

    /// The sensor part of the reading
    pub fn sample(&self) -> RawSample {
        RawSample {
            temperature: self.temperature,
            humidity: self.humidity,
            light: self.light,
            gas: self.gas,
        }
    }
}
