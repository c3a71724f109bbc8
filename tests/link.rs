//! Transmitter to receiver over an in-memory radio

use std::cell::RefCell;
use std::rc::Rc;

use envlink::config::{RadioConfig, MAIN_LOOP_TICK_MS, MAX_PAYLOAD, RECEIVER_ADDRESS, TRANSMITTER_ADDRESS};
use envlink::indicator::{Indicator, IndicatorColor};
use envlink::radio::{Frame, Transport};
use envlink::rendering::{Display, Screen};
use envlink::sensors::{EnvironmentSensors, SensorKind};
use envlink::session::{handle_frame, CycleOutcome};
use envlink::{EnvironmentModel, RawSample, Receiver, SensorError, TelemetryCell, Transmitter};

struct BenchSensors {
    samples: Vec<Result<RawSample, SensorError>>,
    next: usize,
    current: Option<RawSample>,
}

impl BenchSensors {
    fn new(samples: Vec<Result<RawSample, SensorError>>) -> Self {
        Self { samples, next: 0, current: None }
    }
}

impl EnvironmentSensors for BenchSensors {
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError> {
        let sample = self.samples[self.next % self.samples.len()];
        self.next += 1;
        let sample = sample?;
        self.current = Some(sample);
        Ok((sample.temperature, sample.humidity))
    }

    fn read_light(&mut self) -> Result<f32, SensorError> {
        self.current.map(|s| s.light).ok_or(SensorError::Bus(SensorKind::Light))
    }

    fn read_gas(&mut self) -> Result<f32, SensorError> {
        self.current.map(|s| s.gas).ok_or(SensorError::Bus(SensorKind::Gas))
    }
}

/// Delivers every payload to a shared air queue as a received frame
#[derive(Clone, Default)]
struct Air {
    frames: Rc<RefCell<Vec<Frame>>>,
}

impl Transport for Air {
    type Error = ();

    fn send(&mut self, payload: &[u8], destination: u8) -> Result<(), ()> {
        let payload = heapless::Vec::<u8, MAX_PAYLOAD>::from_slice(payload).map_err(|_| ())?;
        self.frames.borrow_mut().push(Frame {
            source: TRANSMITTER_ADDRESS,
            destination,
            payload,
            rssi: -71,
            snr: 9.0,
        });
        Ok(())
    }
}

#[derive(Default)]
struct Panel(Vec<Screen>);

impl Display for Panel {
    fn show(&mut self, screen: &Screen) {
        self.0.push(screen.clone());
    }
}

#[derive(Default)]
struct Led(Vec<IndicatorColor>);

impl Indicator for Led {
    fn show(&mut self, color: IndicatorColor) {
        self.0.push(color);
    }
}

fn scenario() -> RawSample {
    RawSample { temperature: 23.5, humidity: 55.0, light: 310.0, gas: 120.0 }
}

#[test]
fn test_scenario_reaches_receiver_display() {
    let air = Air::default();
    let model = EnvironmentModel::new().unwrap();
    let mut tx = Transmitter::new(BenchSensors::new(vec![Ok(scenario())]), air.clone(), model, RECEIVER_ADDRESS);

    let cell = TelemetryCell::new();
    let mut rx = Receiver::new(Panel::default(), Led::default(), RadioConfig::receiver());
    rx.start();

    let outcome = tx.tick(MAIN_LOOP_TICK_MS).unwrap().unwrap();
    let score = match outcome {
        CycleOutcome::Sent { sequence: 1, reading } => reading.environment_score,
        other => panic!("unexpected outcome {other:?}"),
    };
    assert!((score - 64.98).abs() < 0.05, "score {score}");

    // Interrupt context
    let frames: Vec<Frame> = air.frames.borrow_mut().drain(..).collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload.as_slice(), b"E:65,T:23.5,H:55,L:310,G:120");
    assert_eq!(frames[0].destination, RECEIVER_ADDRESS);
    assert_eq!(handle_frame(&cell, &frames[0]), Ok(1));

    // Main loop
    let snapshot = rx.tick(&cell, MAIN_LOOP_TICK_MS).unwrap();
    let reading = snapshot.reading;
    assert_eq!(reading.temperature, 23.5);
    assert_eq!(reading.humidity, 55.0);
    assert_eq!(reading.light, 310.0);
    assert_eq!(reading.gas, 120.0);
    assert_eq!(reading.environment_score, 65.0);
    assert_eq!(snapshot.signal_strength, -71);

    let screen = rx.display().0.last().unwrap();
    assert_eq!(screen.line(0), "T:23.5C H:55%");
    assert_eq!(screen.line(2), "Env score: 65");
    assert_eq!(screen.line(4), "RSSI -71 dBm");
    assert_eq!(
        rx.indicator().0,
        vec![IndicatorColor::Starting, IndicatorColor::Idle, IndicatorColor::Activity]
    );
}

#[test]
fn test_skipped_and_malformed_cycles_keep_link_alive() {
    let air = Air::default();
    let samples = vec![
        Ok(scenario()),
        Err(SensorError::Bus(SensorKind::Climate)),
        Ok(RawSample { temperature: 30.0, ..scenario() }),
    ];
    let mut tx = Transmitter::new(
        BenchSensors::new(samples),
        air.clone(),
        EnvironmentModel::new().unwrap(),
        RECEIVER_ADDRESS,
    );
    let cell = TelemetryCell::new();
    let mut rx = Receiver::new(Panel::default(), Led::default(), RadioConfig::receiver());
    rx.start();

    for _ in 0..3 {
        tx.run_cycle().unwrap();
    }
    let stats = tx.stats();
    assert_eq!((stats.sent, stats.skipped, stats.send_failures), (2, 1, 0));

    // A corrupted frame lands between the two good ones
    let mut frames: Vec<Frame> = air.frames.borrow_mut().drain(..).collect();
    let mut garbled = frames[0].clone();
    garbled.payload.truncate(12);
    frames.insert(1, garbled);

    let mut rendered = Vec::new();
    for frame in &frames {
        let _ = handle_frame(&cell, frame);
        if let Some(snapshot) = rx.tick(&cell, MAIN_LOOP_TICK_MS) {
            rendered.push(snapshot);
        }
    }

    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].sequence, 1);
    assert_eq!(rendered[1].sequence, 2);
    assert_eq!(rendered[1].reading.temperature, 30.0);

    let link = cell.stats();
    assert_eq!((link.received, link.malformed, link.overwritten), (2, 1, 0));
}
