//! Link session loops
//!
//! [`Transmitter`] runs the sample → score → encode → send cycle on a
//! countdown. The receiver is split across two contexts: [`service_radio`]
//! runs in the radio interrupt and only reads, decodes and publishes, while
//! [`Receiver::tick`] runs in the main loop and does everything slow
//! (display, LED, logging) on a copy taken from the [`TelemetryCell`].

use crate::codec::{decode, encode};
use crate::config::{RadioConfig, FEEDBACK_MS, SAMPLE_INTERVAL_MS};
use crate::error::{DecodeError, EncodeError, RadioError, SensorError};
use crate::indicator::{Indicator, IndicatorColor};
use crate::model::EnvironmentModel;
use crate::radio::{Frame, Sx127x, Transport};
use crate::reading::SensorReading;
use crate::rendering::{message_screen, reading_screen, waiting_screen, Display};
use crate::sensors::EnvironmentSensors;
use crate::telemetry::{TelemetryCell, TelemetrySnapshot};
use crate::timer::CountDownTimer;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

// ============================================================================
// Transmitter
// ============================================================================

/// Result of one transmit cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// Radio confirmed the packet; `sequence` is the new sent count
    Sent { sequence: u32, reading: SensorReading },
    /// Packet built but the radio reported an error
    SendFailed { reading: SensorReading },
    /// A sensor read failed, nothing was sent
    Skipped(SensorError),
}

impl CycleOutcome {
    /// The reading built this cycle, sent or not
    pub fn reading(&self) -> Option<SensorReading> {
        match self {
            Self::Sent { reading, .. } | Self::SendFailed { reading } => Some(*reading),
            Self::Skipped(_) => None,
        }
    }
}

/// Transmit-side counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxStats {
    pub sent: u32,
    pub send_failures: u32,
    pub skipped: u32,
}

/// Sensor node loop
pub struct Transmitter<S, T> {
    sensors: S,
    transport: T,
    model: EnvironmentModel,
    destination: u8,
    timer: CountDownTimer,
    stats: TxStats,
}

impl<S: EnvironmentSensors, T: Transport> Transmitter<S, T> {
    /// The first cycle runs on the first tick
    pub fn new(sensors: S, transport: T, model: EnvironmentModel, destination: u8) -> Self {
        Self {
            sensors,
            transport,
            model,
            destination,
            timer: CountDownTimer::finished(),
            stats: TxStats::default(),
        }
    }

    /// Advance the sample countdown; runs a cycle when it expires.
    ///
    /// An `Err` means a reading could not be encoded and the node should halt.
    pub fn tick(&mut self, elapsed_ms: u32) -> Result<Option<CycleOutcome>, EncodeError> {
        self.timer.tick(elapsed_ms);
        if !self.timer.is_finished() {
            return Ok(None);
        }
        self.timer.set_time(SAMPLE_INTERVAL_MS);
        self.run_cycle().map(Some)
    }

    /// Sample, score, encode and send once
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, EncodeError> {
        let sample = match self.sensors.sample() {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.skipped = self.stats.skipped.wrapping_add(1);
                log_warn!("Cycle skipped: {}", e);
                return Ok(CycleOutcome::Skipped(e));
            }
        };

        let score = self.model.score(&sample);
        let reading = SensorReading::new(sample, score);
        let packet = encode(&reading)?;

        match self.transport.send(packet.as_bytes(), self.destination) {
            Ok(()) => {
                self.stats.sent = self.stats.sent.wrapping_add(1);
                log_info!("Sent #{}: {}", self.stats.sent, packet.as_str());
                Ok(CycleOutcome::Sent { sequence: self.stats.sent, reading })
            }
            Err(_) => {
                self.stats.send_failures = self.stats.send_failures.wrapping_add(1);
                log_warn!("Send failed ({} so far): {}", self.stats.send_failures, packet.as_str());
                Ok(CycleOutcome::SendFailed { reading })
            }
        }
    }

    pub fn stats(&self) -> TxStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// ============================================================================
// Receiver
// ============================================================================

/// Decode `frame` and publish it. Call from the radio interrupt.
///
/// Returns the sequence number of the published reading. Malformed frames
/// are counted and leave the stored reading untouched.
pub fn handle_frame(cell: &TelemetryCell, frame: &Frame) -> Result<u32, DecodeError> {
    match decode(&frame.payload) {
        Ok(reading) => Ok(cell.publish(reading, frame.rssi)),
        Err(e) => {
            let malformed = cell.record_malformed();
            log_warn!("Malformed packet #{} from {}: {}", malformed, frame.source, e);
            Err(e)
        }
    }
}

/// Service a DIO0 interrupt: read the pending frame and publish it.
///
/// Returns the sequence number of a published reading. Frames for other
/// nodes and spurious interrupts give `Ok(None)`, as do payloads that fail
/// to decode (counted by [`handle_frame`]). Corrupt frames are counted as
/// malformed and returned; bus errors are returned uncounted.
pub fn service_radio<SPI, RST, D, E>(
    radio: &mut Sx127x<SPI, RST, D>,
    cell: &TelemetryCell,
) -> Result<Option<u32>, RadioError<E>>
where
    SPI: SpiDevice<Error = E>,
    RST: OutputPin,
    D: DelayNs,
{
    match radio.read_frame() {
        Ok(Some(frame)) => Ok(handle_frame(cell, &frame).ok()),
        Ok(None) => Ok(None),
        Err(
            e @ (RadioError::CrcMismatch
            | RadioError::ShortFrame { .. }
            | RadioError::PayloadTooLarge { .. }),
        ) => {
            let malformed = cell.record_malformed();
            log_debug!("Corrupt frame, {} malformed so far", malformed);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Display node main loop
pub struct Receiver<D, L> {
    display: D,
    indicator: L,
    config: RadioConfig,
    feedback: CountDownTimer,
    lit: bool,
}

impl<D: Display, L: Indicator> Receiver<D, L> {
    /// Shows the starting color straight away
    pub fn new(display: D, mut indicator: L, config: RadioConfig) -> Self {
        indicator.show(IndicatorColor::Starting);
        Self {
            display,
            indicator,
            config,
            feedback: CountDownTimer::finished(),
            lit: false,
        }
    }

    /// Peripherals are up: idle color and waiting screen
    pub fn start(&mut self) {
        self.indicator.show(IndicatorColor::Idle);
        self.display.show(&waiting_screen(&self.config));
        log_info!("Receiver ready at address #{}, waiting for packets", self.config.address);
    }

    /// Enter the visible fault state
    pub fn fail(&mut self, message: &str) {
        self.indicator.show(IndicatorColor::Fault);
        self.display.show(&message_screen("FATAL ERROR", message));
        log_error!("{}", message);
    }

    /// One main loop iteration. Returns the snapshot it rendered, if any.
    pub fn tick(&mut self, cell: &TelemetryCell, elapsed_ms: u32) -> Option<TelemetrySnapshot> {
        if let Some(snapshot) = cell.take() {
            self.indicator.show(IndicatorColor::Activity);
            self.display.show(&reading_screen(&snapshot));

            let r = &snapshot.reading;
            log_info!(
                "Packet #{} | T:{} H:{} L:{} | G:{} | E:{} | RSSI {}",
                snapshot.sequence,
                r.temperature,
                r.humidity,
                r.light,
                r.gas,
                r.environment_score,
                snapshot.signal_strength
            );

            self.feedback.set_time(FEEDBACK_MS);
            self.lit = true;
            return Some(snapshot);
        }

        if self.lit {
            self.feedback.tick(elapsed_ms);
            if self.feedback.is_finished() {
                self.indicator.show(IndicatorColor::Idle);
                self.lit = false;
            }
        }
        None
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn indicator(&self) -> &L {
        &self.indicator
    }
}
