//! Build-time configuration shared by both nodes.
//!
//! Nothing here is runtime configurable: the values are compiled into the
//! firmware. `RadioConfig::validate` runs once at startup so a bad constant
//! ends in the fatal error state instead of a half-working radio.

use crate::error::ConfigError;

/// LoRa carrier frequency (915 MHz ISM band)
pub const LORA_FREQUENCY_HZ: u32 = 915_000_000;
/// Transmit power on PA_BOOST
pub const LORA_TX_POWER_DBM: i8 = 17;
/// Address of the sensor node
pub const TRANSMITTER_ADDRESS: u8 = 0x01;
/// Address of the display node
pub const RECEIVER_ADDRESS: u8 = 0x02;
/// Frames addressed here are accepted by every node
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Largest encoded packet, in bytes
pub const MAX_PAYLOAD: usize = 64;

pub const MAIN_LOOP_TICK_MS: u32 = 10;
pub const SAMPLE_INTERVAL_MS: u32 = 1000; // One packet per second
pub const FEEDBACK_MS: u32 = 100; // Activity LED on-time after a packet

/// Network shape: temperature, humidity, gas, light in; score out
pub const INPUT_LAYER_LEN: usize = 4;
pub const HIDDEN_LAYER_LEN: usize = 10;
pub const OUTPUT_LAYER_LEN: usize = 1;

/// Radio parameters for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub frequency_hz: u32,
    pub tx_power_dbm: i8,
    pub address: u8,
}

impl RadioConfig {
    /// Configuration of the sensor node
    pub const fn transmitter() -> Self {
        Self {
            frequency_hz: LORA_FREQUENCY_HZ,
            tx_power_dbm: LORA_TX_POWER_DBM,
            address: TRANSMITTER_ADDRESS,
        }
    }

    /// Configuration of the display node
    pub const fn receiver() -> Self {
        Self {
            frequency_hz: LORA_FREQUENCY_HZ,
            tx_power_dbm: LORA_TX_POWER_DBM,
            address: RECEIVER_ADDRESS,
        }
    }

    /// Frequency in whole MHz, for display
    pub fn frequency_mhz(&self) -> u32 {
        self.frequency_hz / 1_000_000
    }

    /// Check the values against what the SX127x supports
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(137_000_000..=1_020_000_000).contains(&self.frequency_hz) {
            return Err(ConfigError::FrequencyOutOfRange { hz: self.frequency_hz });
        }

        if !(2..=20).contains(&self.tx_power_dbm) {
            return Err(ConfigError::TxPowerOutOfRange { dbm: self.tx_power_dbm });
        }

        if self.address == BROADCAST_ADDRESS {
            return Err(ConfigError::ReservedAddress { address: self.address });
        }

        Ok(())
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::receiver()
    }
}
