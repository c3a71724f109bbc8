//! SX127x LoRa transceiver driver
//!
//! Drives an SX1276/77/78/79 over an `embedded-hal` 1.0 [`SpiDevice`].
//! Every frame starts with a two byte `[destination, source]` header;
//! frames addressed to another node are dropped on read.
//!
//! # Example
//!
//! ```ignore
//! let mut radio = Sx127x::new(spi, reset, delay, RadioConfig::receiver());
//! radio.init()?;
//! radio.listen()?;
//!
//! // DIO0 rising edge
//! if let Some(frame) = radio.read_frame()? {
//!     // frame.payload, frame.rssi
//! }
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiDevice};
use heapless::Vec;

use crate::config::{RadioConfig, BROADCAST_ADDRESS, MAX_PAYLOAD};
use crate::error::RadioError;

/// SX127x register addresses (LoRa mode)
#[allow(dead_code)]
mod regs {
    pub const FIFO: u8 = 0x00;
    pub const OP_MODE: u8 = 0x01;
    pub const FRF_MSB: u8 = 0x06;
    pub const FRF_MID: u8 = 0x07;
    pub const FRF_LSB: u8 = 0x08;
    pub const PA_CONFIG: u8 = 0x09;
    pub const LNA: u8 = 0x0C;
    pub const FIFO_ADDR_PTR: u8 = 0x0D;
    pub const FIFO_TX_BASE_ADDR: u8 = 0x0E;
    pub const FIFO_RX_BASE_ADDR: u8 = 0x0F;
    pub const FIFO_RX_CURRENT_ADDR: u8 = 0x10;
    pub const IRQ_FLAGS: u8 = 0x12;
    pub const RX_NB_BYTES: u8 = 0x13;
    pub const PKT_SNR_VALUE: u8 = 0x19;
    pub const PKT_RSSI_VALUE: u8 = 0x1A;
    pub const PAYLOAD_LENGTH: u8 = 0x22;
    pub const MODEM_CONFIG_3: u8 = 0x26;
    pub const DIO_MAPPING_1: u8 = 0x40;
    pub const VERSION: u8 = 0x42;
    pub const PA_DAC: u8 = 0x4D;
}

/// RegOpMode values
mod mode {
    pub const LONG_RANGE: u8 = 0x80;
    pub const SLEEP: u8 = 0x00;
    pub const STANDBY: u8 = 0x01;
    pub const TX: u8 = 0x03;
    pub const RX_CONTINUOUS: u8 = 0x05;
}

/// RegIrqFlags bits
mod irq {
    pub const TX_DONE: u8 = 0x08;
    pub const CRC_ERROR: u8 = 0x20;
    pub const RX_DONE: u8 = 0x40;
}

const WRITE: u8 = 0x80;
const EXPECTED_VERSION: u8 = 0x12;
const CRYSTAL_HZ: u64 = 32_000_000;
const HEADER_LEN: usize = 2;
/// Longest frame the FIFO can hold
const MAX_FRAME: usize = 255;
const TX_TIMEOUT_MS: u32 = 1000;
/// High frequency port starts here; the RSSI offset differs below it
const HF_PORT_MIN_HZ: u32 = 779_000_000;

/// Outbound side of the link
pub trait Transport {
    type Error;

    /// Send one payload and block until the radio reports it sent
    fn send(&mut self, payload: &[u8], destination: u8) -> Result<(), Self::Error>;
}

/// A received frame addressed to this node
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub source: u8,
    pub destination: u8,
    pub payload: Vec<u8, MAX_PAYLOAD>,
    /// Packet RSSI in dBm
    pub rssi: i16,
    /// Packet SNR in dB
    pub snr: f32,
}

/// SX127x driver
pub struct Sx127x<SPI, RST, D> {
    spi: SPI,
    reset: RST,
    delay: D,
    config: RadioConfig,
}

impl<SPI, RST, D, E> Sx127x<SPI, RST, D>
where
    SPI: SpiDevice<Error = E>,
    RST: OutputPin,
    D: DelayNs,
{
    #[must_use]
    pub fn new(spi: SPI, reset: RST, delay: D, config: RadioConfig) -> Self {
        Self { spi, reset, delay, config }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Reset the chip, check its version and configure LoRa mode
    pub fn init(&mut self) -> Result<(), RadioError<E>> {
        self.reset.set_low().map_err(|_| RadioError::Reset)?;
        self.delay.delay_ms(10);
        self.reset.set_high().map_err(|_| RadioError::Reset)?;
        self.delay.delay_ms(10);

        let version = self.read_register(regs::VERSION)?;
        if version != EXPECTED_VERSION {
            return Err(RadioError::UnknownVersion { found: version });
        }

        // Long range mode can only be entered from sleep
        self.set_mode(mode::SLEEP)?;
        self.set_frequency(self.config.frequency_hz)?;
        self.write_register(regs::FIFO_TX_BASE_ADDR, 0)?;
        self.write_register(regs::FIFO_RX_BASE_ADDR, 0)?;

        // LNA boost, automatic gain control
        let lna = self.read_register(regs::LNA)?;
        self.write_register(regs::LNA, lna | 0x03)?;
        self.write_register(regs::MODEM_CONFIG_3, 0x04)?;

        self.set_tx_power(self.config.tx_power_dbm)?;
        self.set_mode(mode::STANDBY)?;

        log_info!("SX127x ready at {} MHz", self.config.frequency_mhz());
        Ok(())
    }

    /// Enter continuous receive with DIO0 mapped to RxDone
    pub fn listen(&mut self) -> Result<(), RadioError<E>> {
        self.write_register(regs::DIO_MAPPING_1, 0x00)?;
        self.set_mode(mode::RX_CONTINUOUS)
    }

    /// Collect a pending frame and acknowledge the interrupt.
    ///
    /// `Ok(None)` when nothing was received or the frame is for another node.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, RadioError<E>> {
        let flags = self.read_register(regs::IRQ_FLAGS)?;
        self.write_register(regs::IRQ_FLAGS, flags)?;

        if flags & irq::RX_DONE == 0 {
            return Ok(None);
        }
        if flags & irq::CRC_ERROR != 0 {
            return Err(RadioError::CrcMismatch);
        }

        let length = usize::from(self.read_register(regs::RX_NB_BYTES)?);
        if length < HEADER_LEN {
            return Err(RadioError::ShortFrame { length });
        }

        let current = self.read_register(regs::FIFO_RX_CURRENT_ADDR)?;
        self.write_register(regs::FIFO_ADDR_PTR, current)?;
        let mut buffer = [0u8; MAX_FRAME];
        self.spi
            .transaction(&mut [Operation::Write(&[regs::FIFO]), Operation::Read(&mut buffer[..length])])
            .map_err(RadioError::Spi)?;

        let (destination, source) = (buffer[0], buffer[1]);
        if destination != self.config.address && destination != BROADCAST_ADDRESS {
            log_debug!("Dropped frame for {:#x} from {:#x}", destination, source);
            return Ok(None);
        }

        let payload = Vec::from_slice(&buffer[HEADER_LEN..length])
            .map_err(|()| RadioError::PayloadTooLarge { length: length - HEADER_LEN, maximum: MAX_PAYLOAD })?;

        let raw_rssi = i16::from(self.read_register(regs::PKT_RSSI_VALUE)?);
        let rssi = if self.config.frequency_hz >= HF_PORT_MIN_HZ { raw_rssi - 157 } else { raw_rssi - 164 };
        let snr = f32::from(self.read_register(regs::PKT_SNR_VALUE)? as i8) / 4.0;

        Ok(Some(Frame { source, destination, payload, rssi, snr }))
    }

    fn set_mode(&mut self, op_mode: u8) -> Result<(), RadioError<E>> {
        self.write_register(regs::OP_MODE, mode::LONG_RANGE | op_mode)
    }

    fn set_frequency(&mut self, hz: u32) -> Result<(), RadioError<E>> {
        let frf = (u64::from(hz) << 19) / CRYSTAL_HZ;
        self.write_register(regs::FRF_MSB, (frf >> 16) as u8)?;
        self.write_register(regs::FRF_MID, (frf >> 8) as u8)?;
        self.write_register(regs::FRF_LSB, frf as u8)
    }

    /// PA_BOOST output. Above 17 dBm the high power DAC is enabled.
    fn set_tx_power(&mut self, dbm: i8) -> Result<(), RadioError<E>> {
        let mut level = dbm.clamp(2, 20) as u8;
        if level > 17 {
            self.write_register(regs::PA_DAC, 0x87)?;
            level -= 3;
        } else {
            self.write_register(regs::PA_DAC, 0x84)?;
        }
        self.write_register(regs::PA_CONFIG, 0x80 | (level - 2))
    }

    fn read_register(&mut self, addr: u8) -> Result<u8, RadioError<E>> {
        let mut value = [0u8];
        self.spi
            .transaction(&mut [Operation::Write(&[addr & !WRITE]), Operation::Read(&mut value)])
            .map_err(RadioError::Spi)?;
        Ok(value[0])
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), RadioError<E>> {
        self.spi.write(&[addr | WRITE, value]).map_err(RadioError::Spi)
    }
}

impl<SPI, RST, D, E> Transport for Sx127x<SPI, RST, D>
where
    SPI: SpiDevice<Error = E>,
    RST: OutputPin,
    D: DelayNs,
{
    type Error = RadioError<E>;

    fn send(&mut self, payload: &[u8], destination: u8) -> Result<(), Self::Error> {
        if payload.len() > MAX_PAYLOAD {
            return Err(RadioError::PayloadTooLarge { length: payload.len(), maximum: MAX_PAYLOAD });
        }

        self.set_mode(mode::STANDBY)?;
        self.write_register(regs::FIFO_ADDR_PTR, 0)?;
        let header = [destination, self.config.address];
        self.spi
            .transaction(&mut [
                Operation::Write(&[regs::FIFO | WRITE]),
                Operation::Write(&header),
                Operation::Write(payload),
            ])
            .map_err(RadioError::Spi)?;
        self.write_register(regs::PAYLOAD_LENGTH, (payload.len() + HEADER_LEN) as u8)?;
        self.set_mode(mode::TX)?;

        let mut waited_ms = 0;
        loop {
            if self.read_register(regs::IRQ_FLAGS)? & irq::TX_DONE != 0 {
                self.write_register(regs::IRQ_FLAGS, irq::TX_DONE)?;
                return Ok(());
            }
            if waited_ms >= TX_TIMEOUT_MS {
                self.set_mode(mode::STANDBY)?;
                return Err(RadioError::TxTimeout { waited_ms });
            }
            self.delay.delay_ms(1);
            waited_ms += 1;
        }
    }
}
