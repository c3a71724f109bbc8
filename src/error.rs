//! Error types for the telemetry link
//!
//! Every error here is `no_std` friendly: no allocation, `Copy` where the
//! payload allows it, `Display` for host logs and `defmt::Format` for the
//! firmware.

use core::fmt;

use crate::codec::Field;
use crate::sensors::SensorKind;

// ============================================================================
// Configuration Errors
// ============================================================================

/// A build-time constant set that cannot be used.
///
/// These are raised once at startup; the node never reaches its main loop
/// with an invalid configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// A layer was configured with zero units
    ZeroDimension {
        /// Which layer
        layer: &'static str,
    },
    /// The weight slice does not hold `rows × (columns + 1)` values
    WeightCount {
        /// Which layer
        layer: &'static str,
        /// Expected number of weights
        expected: usize,
        /// Number of weights supplied
        actual: usize,
    },
    /// The layer does not fit the statically sized buffers
    CapacityExceeded {
        /// Which layer
        layer: &'static str,
        /// Required capacity
        required: usize,
        /// Available capacity
        available: usize,
    },
    /// Normalization bounds with `max <= min` (or not finite)
    InvalidBounds {
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },
    /// Carrier frequency outside the SX127x tuning range
    FrequencyOutOfRange {
        /// Requested frequency in Hz
        hz: u32,
    },
    /// Transmit power outside what PA_BOOST can deliver
    TxPowerOutOfRange {
        /// Requested power in dBm
        dbm: i8,
    },
    /// Node address collides with the broadcast address
    ReservedAddress {
        /// Offending address
        address: u8,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDimension { layer } => write!(f, "{layer} layer has zero units"),
            Self::WeightCount { layer, expected, actual } => {
                write!(f, "{layer} layer expects {expected} weights, got {actual}")
            }
            Self::CapacityExceeded { layer, required, available } => {
                write!(f, "{layer} layer needs {required} slots, only {available} available")
            }
            Self::InvalidBounds { min, max } => {
                write!(f, "Invalid normalization bounds: min {min} >= max {max}")
            }
            Self::FrequencyOutOfRange { hz } => write!(f, "Frequency {hz} Hz out of range"),
            Self::TxPowerOutOfRange { dbm } => write!(f, "TX power {dbm} dBm out of range"),
            Self::ReservedAddress { address } => {
                write!(f, "Address 0x{address:02X} is reserved")
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::ZeroDimension { layer } => defmt::write!(f, "{}: zero units", layer),
            Self::WeightCount { layer, expected, actual } => {
                defmt::write!(f, "{}: {} weights != {}", layer, actual, expected);
            }
            Self::CapacityExceeded { layer, required, available } => {
                defmt::write!(f, "{}: {} > {}", layer, required, available);
            }
            Self::InvalidBounds { min, max } => defmt::write!(f, "Bounds {} >= {}", min, max),
            Self::FrequencyOutOfRange { hz } => defmt::write!(f, "Freq {}Hz", hz),
            Self::TxPowerOutOfRange { dbm } => defmt::write!(f, "TX power {}dBm", dbm),
            Self::ReservedAddress { address } => defmt::write!(f, "Reserved addr {:#x}", address),
        }
    }
}

// ============================================================================
// Codec Errors
// ============================================================================

/// A reading that cannot be put on the wire.
///
/// The receiver could not recover a truncated number, so this is fatal at
/// send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Formatted packet is longer than the payload limit
    PayloadTooLarge {
        /// Payload limit in bytes
        maximum: usize,
    },
    /// NaN or infinite value the receiver could not parse
    NonFinite {
        /// Offending field
        field: Field,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { maximum } => {
                write!(f, "Encoded packet exceeds {maximum} bytes")
            }
            Self::NonFinite { field } => {
                write!(f, "Field {} is not a finite number", field.key() as char)
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EncodeError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::PayloadTooLarge { maximum } => defmt::write!(f, "Packet > {} bytes", maximum),
            Self::NonFinite { field } => defmt::write!(f, "{} not finite", field.key() as char),
        }
    }
}

/// Why a received frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Frame ended before the field
    MissingField,
    /// A different key (or no key) where `field` was expected
    UnexpectedKey {
        /// Byte found instead of the key
        found: u8,
    },
    /// Key not followed by `:`
    MissingColon,
    /// Value is not a decimal number
    MalformedValue,
    /// Value not followed by `,`
    MissingSeparator,
}

/// A malformed packet. Never fatal; the caller counts and drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    /// Field being scanned when decoding stopped
    pub field: Field,
    /// Number of fields fully parsed before the failure
    pub parsed: u8,
    /// What went wrong
    pub kind: DecodeErrorKind,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.field.key() as char;
        match self.kind {
            DecodeErrorKind::MissingField => write!(f, "Missing field {key}")?,
            DecodeErrorKind::UnexpectedKey { found } => {
                write!(f, "Expected key {key}, found 0x{found:02X}")?;
            }
            DecodeErrorKind::MissingColon => write!(f, "Missing ':' after {key}")?,
            DecodeErrorKind::MalformedValue => write!(f, "Malformed value for {key}")?,
            DecodeErrorKind::MissingSeparator => write!(f, "Missing ',' after {key}")?,
        }
        write!(f, " ({}/5 fields parsed)", self.parsed)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DecodeError {
    fn format(&self, f: defmt::Formatter) {
        let key = self.field.key() as char;
        match self.kind {
            DecodeErrorKind::MissingField => defmt::write!(f, "missing {}", key),
            DecodeErrorKind::UnexpectedKey { found } => {
                defmt::write!(f, "expected {}, got {:#x}", key, found);
            }
            DecodeErrorKind::MissingColon => defmt::write!(f, "no ':' after {}", key),
            DecodeErrorKind::MalformedValue => defmt::write!(f, "bad value for {}", key),
            DecodeErrorKind::MissingSeparator => defmt::write!(f, "no ',' after {}", key),
        }
        defmt::write!(f, " ({}/5)", self.parsed);
    }
}

// ============================================================================
// Sensor Errors
// ============================================================================

/// A sensor read that produced no usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus transaction failed
    Bus(SensorKind),
    /// Sensor answered but the conversion is not usable
    Conversion(SensorKind),
}

impl SensorError {
    /// Sensor that failed
    pub fn sensor(&self) -> SensorKind {
        match self {
            Self::Bus(kind) | Self::Conversion(kind) => *kind,
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "{} sensor bus error", kind.name()),
            Self::Conversion(kind) => write!(f, "{} sensor conversion failed", kind.name()),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Bus(kind) => defmt::write!(f, "{} bus error", kind.name()),
            Self::Conversion(kind) => defmt::write!(f, "{} conversion failed", kind.name()),
        }
    }
}

// ============================================================================
// Radio Errors
// ============================================================================

/// Errors from the SX127x LoRa transceiver driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError<E> {
    /// SPI communication failure
    Spi(E),
    /// Reset line could not be driven
    Reset,
    /// Silicon version register did not read 0x12
    UnknownVersion {
        /// Value that was read
        found: u8,
    },
    /// Payload does not fit one frame
    PayloadTooLarge {
        /// Payload length in bytes
        length: usize,
        /// Maximum payload length
        maximum: usize,
    },
    /// TX_DONE never raised
    TxTimeout {
        /// Time waited in milliseconds
        waited_ms: u32,
    },
    /// Frame arrived with a bad CRC
    CrcMismatch,
    /// Frame too short to carry the address header
    ShortFrame {
        /// Received length
        length: usize,
    },
}

impl<E: fmt::Debug> fmt::Display for RadioError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI communication error: {e:?}"),
            Self::Reset => write!(f, "Could not drive radio reset line"),
            Self::UnknownVersion { found } => {
                write!(f, "Unknown radio version 0x{found:02X} (expected 0x12)")
            }
            Self::PayloadTooLarge { length, maximum } => {
                write!(f, "Payload too large: {length} bytes (max {maximum})")
            }
            Self::TxTimeout { waited_ms } => write!(f, "TX not done after {waited_ms}ms"),
            Self::CrcMismatch => write!(f, "Received frame failed CRC"),
            Self::ShortFrame { length } => write!(f, "Frame too short: {length} bytes"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for RadioError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Spi(e) => defmt::write!(f, "SPI error: {}", e),
            Self::Reset => defmt::write!(f, "Reset pin error"),
            Self::UnknownVersion { found } => defmt::write!(f, "Bad version {:#x}", found),
            Self::PayloadTooLarge { length, maximum } => {
                defmt::write!(f, "Payload {} > {}", length, maximum);
            }
            Self::TxTimeout { waited_ms } => defmt::write!(f, "TX timeout {}ms", waited_ms),
            Self::CrcMismatch => defmt::write!(f, "CRC error"),
            Self::ShortFrame { length } => defmt::write!(f, "Short frame: {}", length),
        }
    }
}
