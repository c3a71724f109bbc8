//! embedded-hal fakes for driver tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiDevice};

/// Accumulates requested delays instead of sleeping
#[derive(Default)]
pub struct FakeDelay {
    pub total_ns: u64,
}

impl FakeDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// ----------------------------------------------------------------------------
// I2C
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct I2cState {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: VecDeque<Vec<u8>>,
    pub fail: bool,
}

/// I2C bus that logs writes and answers reads from a queue
#[derive(Clone, Default)]
pub struct FakeI2c {
    pub state: Rc<RefCell<I2cState>>,
}

impl FakeI2c {
    pub fn queue_read(&self, bytes: &[u8]) {
        self.state.borrow_mut().reads.push_back(bytes.to_vec());
    }

    pub fn written(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.borrow().writes.clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }
}

impl i2c::ErrorType for FakeI2c {
    type Error = i2c::ErrorKind;
}

impl I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail {
            return Err(i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => state.writes.push((address, bytes.to_vec())),
                i2c::Operation::Read(buffer) => {
                    let data = state.reads.pop_front().ok_or(i2c::ErrorKind::Other)?;
                    buffer.copy_from_slice(&data[..buffer.len()]);
                }
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// GPIO
// ----------------------------------------------------------------------------

/// Output pin whose level and history can be inspected after it is moved
#[derive(Clone, Default)]
pub struct FakePin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl FakePin {
    pub fn is_high(&self) -> bool {
        self.levels.borrow().last().copied().unwrap_or(false)
    }

    pub fn history(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }
}

impl digital::ErrorType for FakePin {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// SX1276 register file over SPI
// ----------------------------------------------------------------------------

const REG_FIFO: u8 = 0x00;
const REG_OP_MODE: u8 = 0x01;
const REG_FIFO_ADDR_PTR: u8 = 0x0D;
const REG_IRQ_FLAGS: u8 = 0x12;
const REG_RX_NB_BYTES: u8 = 0x13;
const REG_PKT_SNR: u8 = 0x19;
const REG_PKT_RSSI: u8 = 0x1A;
const REG_RX_CURRENT_ADDR: u8 = 0x10;
const REG_PAYLOAD_LENGTH: u8 = 0x22;
const REG_TX_BASE: u8 = 0x0E;
const REG_VERSION: u8 = 0x42;

pub struct RadioState {
    pub registers: [u8; 0x80],
    pub fifo: [u8; 256],
    /// Payloads seen when the chip was put in TX mode
    pub transmitted: Vec<Vec<u8>>,
    /// Raise TX_DONE when TX mode is entered
    pub tx_completes: bool,
    pub fail: bool,
}

/// Minimal SX1276: register reads and writes, FIFO pointer, IRQ flags
#[derive(Clone)]
pub struct FakeSx1276 {
    pub state: Rc<RefCell<RadioState>>,
}

impl FakeSx1276 {
    pub fn new() -> Self {
        let mut registers = [0u8; 0x80];
        registers[usize::from(REG_VERSION)] = 0x12;
        Self {
            state: Rc::new(RefCell::new(RadioState {
                registers,
                fifo: [0; 256],
                transmitted: Vec::new(),
                tx_completes: true,
                fail: false,
            })),
        }
    }

    pub fn register(&self, address: u8) -> u8 {
        self.state.borrow().registers[usize::from(address)]
    }

    pub fn set_register(&self, address: u8, value: u8) {
        self.state.borrow_mut().registers[usize::from(address)] = value;
    }

    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.state.borrow().transmitted.clone()
    }

    /// Place a received frame in the FIFO and raise RX_DONE
    pub fn inject(&self, frame: &[u8], pkt_rssi: u8, pkt_snr: i8, crc_ok: bool) {
        let mut state = self.state.borrow_mut();
        state.fifo[..frame.len()].copy_from_slice(frame);
        let r = &mut state.registers;
        r[usize::from(REG_RX_CURRENT_ADDR)] = 0;
        r[usize::from(REG_RX_NB_BYTES)] = frame.len() as u8;
        r[usize::from(REG_PKT_RSSI)] = pkt_rssi;
        r[usize::from(REG_PKT_SNR)] = pkt_snr as u8;
        r[usize::from(REG_IRQ_FLAGS)] |= 0x40 | if crc_ok { 0 } else { 0x20 };
    }
}

impl RadioState {
    fn write(&mut self, address: u8, value: u8) {
        match address {
            REG_FIFO => {
                let ptr = self.registers[usize::from(REG_FIFO_ADDR_PTR)];
                self.fifo[usize::from(ptr)] = value;
                self.registers[usize::from(REG_FIFO_ADDR_PTR)] = ptr.wrapping_add(1);
            }
            REG_IRQ_FLAGS => self.registers[usize::from(address)] &= !value,
            REG_OP_MODE => {
                self.registers[usize::from(address)] = value;
                if value & 0x07 == 0x03 {
                    let base = usize::from(self.registers[usize::from(REG_TX_BASE)]);
                    let length = usize::from(self.registers[usize::from(REG_PAYLOAD_LENGTH)]);
                    let payload = self.fifo[base..base + length].to_vec();
                    self.transmitted.push(payload);
                    if self.tx_completes {
                        self.registers[usize::from(REG_IRQ_FLAGS)] |= 0x08;
                        // Back to standby, as the chip does after TX
                        self.registers[usize::from(address)] = (value & !0x07) | 0x01;
                    }
                }
            }
            _ => self.registers[usize::from(address)] = value,
        }
    }

    fn read(&mut self, address: u8) -> u8 {
        if address == REG_FIFO {
            let ptr = self.registers[usize::from(REG_FIFO_ADDR_PTR)];
            self.registers[usize::from(REG_FIFO_ADDR_PTR)] = ptr.wrapping_add(1);
            return self.fifo[usize::from(ptr)];
        }
        self.registers[usize::from(address)]
    }
}

impl spi::ErrorType for FakeSx1276 {
    type Error = spi::ErrorKind;
}

impl SpiDevice for FakeSx1276 {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail {
            return Err(spi::ErrorKind::Other);
        }
        // First byte selects the register, bit 7 set for writes
        let mut address: Option<(u8, bool)> = None;
        for operation in operations {
            match operation {
                spi::Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        match address {
                            None => address = Some((byte & 0x7F, byte & 0x80 != 0)),
                            Some((reg, true)) => {
                                state.write(reg, byte);
                                if reg != REG_FIFO {
                                    address = Some((reg + 1, true));
                                }
                            }
                            Some((_, false)) => {}
                        }
                    }
                }
                spi::Operation::Read(buffer) => {
                    for slot in buffer.iter_mut() {
                        if let Some((reg, false)) = address {
                            *slot = state.read(reg);
                            if reg != REG_FIFO {
                                address = Some((reg + 1, false));
                            }
                        }
                    }
                }
                spi::Operation::Transfer(..) | spi::Operation::TransferInPlace(_) => {
                    return Err(spi::ErrorKind::Other);
                }
                spi::Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}
