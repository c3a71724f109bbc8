//! Telemetry hand-off between the radio interrupt and the main loop
//!
//! The interrupt handler is the only producer and the main loop the only
//! consumer. Both touch the cell inside a critical section that covers
//! nothing but the copy of the record and its flag:
//!
//! ```text
//!   Empty --publish--> Pending --take--> Empty --publish--> Pending ...
//!                        |  ^
//!                        +--+ publish again before take: overwritten
//! ```
//!
//! `take` hands out a copy, so rendering and logging happen after the
//! critical section ends and never hold up the next packet.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::reading::SensorReading;

/// The latest reading together with link metadata
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySnapshot {
    pub reading: SensorReading,
    /// RSSI of the frame, in dBm
    pub signal_strength: i16,
    /// Number of packets decoded so far, this one included
    pub sequence: u32,
}

impl TelemetrySnapshot {
    const EMPTY: Self = Self { reading: SensorReading::ZERO, signal_strength: 0, sequence: 0 };
}

/// Receive-side counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Packets decoded and published
    pub received: u32,
    /// Frames that failed to decode
    pub malformed: u32,
    /// Published readings replaced before the main loop took them
    pub overwritten: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CellState {
    Empty,
    Pending,
}

struct Slot {
    state: CellState,
    snapshot: TelemetrySnapshot,
    stats: LinkStats,
}

/// Single-producer, single-consumer telemetry cell
pub struct TelemetryCell {
    slot: Mutex<RefCell<Slot>>,
}

impl TelemetryCell {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(Slot {
                state: CellState::Empty,
                snapshot: TelemetrySnapshot::EMPTY,
                stats: LinkStats { received: 0, malformed: 0, overwritten: 0 },
            })),
        }
    }

    /// Store a freshly decoded reading. Returns its sequence number.
    pub fn publish(&self, reading: SensorReading, signal_strength: i16) -> u32 {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            if slot.state == CellState::Pending {
                slot.stats.overwritten = slot.stats.overwritten.wrapping_add(1);
            }
            slot.stats.received = slot.stats.received.wrapping_add(1);
            slot.snapshot = TelemetrySnapshot {
                reading,
                signal_strength,
                sequence: slot.stats.received,
            };
            slot.state = CellState::Pending;
            slot.snapshot.sequence
        })
    }

    /// Count a frame that failed to decode. The stored reading is untouched.
    pub fn record_malformed(&self) -> u32 {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            slot.stats.malformed = slot.stats.malformed.wrapping_add(1);
            slot.stats.malformed
        })
    }

    /// Copy out the pending reading and mark the cell empty
    pub fn take(&self) -> Option<TelemetrySnapshot> {
        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            match slot.state {
                CellState::Pending => {
                    slot.state = CellState::Empty;
                    Some(slot.snapshot)
                }
                CellState::Empty => None,
            }
        })
    }

    pub fn state(&self) -> CellState {
        critical_section::with(|cs| self.slot.borrow_ref(cs).state)
    }

    pub fn stats(&self) -> LinkStats {
        critical_section::with(|cs| self.slot.borrow_ref(cs).stats)
    }
}

impl Default for TelemetryCell {
    fn default() -> Self {
        Self::new()
    }
}
