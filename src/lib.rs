#![cfg_attr(not(test), no_std)]

//! # envlink
//! ## A two-node LoRa environment telemetry link for the RP2040
//!
//! Features:
//! - Temperature, humidity, light and gas-proxy sampling
//! - On-device 4-10-1 perceptron deriving a 0-100 environment score
//! - Compact ASCII packets over an SX127x LoRa radio
//! - Interrupt-safe telemetry hand-off on the receiver
//! - OLED read-out with RSSI and packet counters, RGB status LED
//!
//! The library is `no_std` and hardware independent; the Pico firmware
//! lives in `src/bin` behind the `rp2040` feature.

#[macro_use]
mod logging;

#[cfg(test)]
mod fakes;

pub mod codec;
pub mod config;
pub mod error;
pub mod indicator;
pub mod mlp;
pub mod model;
pub mod normalize;
pub mod radio;
pub mod reading;
pub mod rendering;
pub mod sensors;
pub mod session;
pub mod telemetry;
pub mod timer;

pub use codec::{decode, encode, Packet};
pub use error::{ConfigError, DecodeError, DecodeErrorKind, EncodeError, RadioError, SensorError};
pub use mlp::{Mlp, Topology};
pub use model::EnvironmentModel;
pub use normalize::{normalize, NormalizationBounds};
pub use reading::{RawSample, SensorReading};
pub use session::{Receiver, Transmitter};
pub use telemetry::{LinkStats, TelemetryCell, TelemetrySnapshot};
