use core::fmt::Write as _;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    text::Text,
};
use heapless::String;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, Ssd1306};
use ufmt::uwrite;

use crate::config::RadioConfig;
use crate::reading::SensorReading;
use crate::session::TxStats;
use crate::telemetry::TelemetrySnapshot;

/// Characters per line with a 6x10 font on 128 columns
pub const LINE_LEN: usize = 21;
/// Text rows on a 64 pixel tall panel
pub const SCREEN_LINES: usize = 5;
/// Baseline of the first row and spacing between rows
const FIRST_BASELINE: i32 = 8;
const LINE_PITCH: i32 = 12;

pub type Line = String<LINE_LEN>;

/// One full screen of text. Lines past the panel width are truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub lines: [Line; SCREEN_LINES],
}

impl Screen {
    fn push(&mut self, row: usize, text: &str) {
        if let Some(line) = self.lines.get_mut(row) {
            for c in text.chars() {
                if line.push(c).is_err() {
                    break;
                }
            }
        }
    }

    pub fn line(&self, row: usize) -> &str {
        self.lines.get(row).map(|l| l.as_str()).unwrap_or("")
    }
}

/// Anything that can show a [`Screen`]
pub trait Display {
    fn show(&mut self, screen: &Screen);
}

/// A panel that failed to come up is skipped
impl<D: Display> Display for Option<D> {
    fn show(&mut self, screen: &Screen) {
        if let Some(display) = self {
            display.show(screen);
        }
    }
}

/// Node name, address and band over a status line
/// param title: node name
/// param config: node radio settings
/// param status: shown on the fourth row
pub fn startup_screen(title: &str, config: &RadioConfig, status: &str) -> Screen {
    let mut screen = Screen::default();
    let mut line: Line = String::new();

    screen.push(0, title);
    let _ = uwrite!(line, "Addr #{} {}MHz", config.address, config.frequency_mhz());
    screen.push(1, &line);
    screen.push(3, status);
    screen
}

/// Shown while waiting for the first packet
/// param config: receiver radio settings
pub fn waiting_screen(config: &RadioConfig) -> Screen {
    startup_screen("LoRa RECEIVER", config, "Waiting packets...")
}

/// Sensor values and score on the first three rows
fn push_values(screen: &mut Screen, reading: &SensorReading) {
    let mut line: Line = String::new();

    let _ = write!(line, "T:{:.1}C H:{:.0}%", reading.temperature, reading.humidity);
    screen.push(0, &line);
    line.clear();

    let _ = write!(line, "L:{:.0}lx G:{:.0}", reading.light, reading.gas);
    screen.push(1, &line);
    line.clear();

    let _ = write!(line, "Env score: {:.0}", reading.environment_score);
    screen.push(2, &line);
}

/// Latest local reading with transmit counters
/// param reading: the reading built this cycle
/// param stats: counters after the cycle
pub fn transmitter_screen(reading: &SensorReading, stats: &TxStats) -> Screen {
    let mut screen = Screen::default();
    push_values(&mut screen, reading);

    let mut line: Line = String::new();
    let _ = uwrite!(line, "Sent #{}", stats.sent);
    screen.push(3, &line);
    line.clear();

    let _ = uwrite!(line, "Fail {} Skip {}", stats.send_failures, stats.skipped);
    screen.push(4, &line);
    screen
}

/// Latest reading with link quality
/// param snapshot: the reading taken from the telemetry cell
pub fn reading_screen(snapshot: &TelemetrySnapshot) -> Screen {
    let mut screen = Screen::default();
    push_values(&mut screen, &snapshot.reading);

    let mut line: Line = String::new();
    let _ = uwrite!(line, "Pkt #{}", snapshot.sequence);
    screen.push(3, &line);
    line.clear();

    let _ = uwrite!(line, "RSSI {} dBm", snapshot.signal_strength);
    screen.push(4, &line);
    screen
}

/// Error or status message
/// param title: first line
/// param detail: second line
pub fn message_screen(title: &str, detail: &str) -> Screen {
    let mut screen = Screen::default();
    screen.push(0, title);
    screen.push(2, detail);
    screen
}

/// SSD1306 128x64 OLED in buffered graphics mode
pub struct OledScreen<DI> {
    display: Ssd1306<DI, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>,
    style: MonoTextStyle<'static, BinaryColor>,
}

impl<DI: WriteOnlyDataCommand> OledScreen<DI> {
    /// Initialise the panel. Fails if the controller does not answer.
    pub fn new(interface: DI) -> Result<Self, display_interface::DisplayError> {
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display.init()?;
        let style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();
        Ok(Self { display, style })
    }
}

impl<DI: WriteOnlyDataCommand> Display for OledScreen<DI> {
    fn show(&mut self, screen: &Screen) {
        let _ = self.display.clear(BinaryColor::Off);
        for (row, line) in screen.lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let baseline = FIRST_BASELINE + LINE_PITCH * row as i32;
            Text::new(line, Point::new(0, baseline), self.style)
                .draw(&mut self.display)
                .ok();
        }
        if self.display.flush().is_err() {
            log_warn!("Display flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            reading: SensorReading {
                temperature: 23.5,
                humidity: 55.0,
                light: 310.0,
                gas: 120.0,
                environment_score: 64.98,
            },
            signal_strength: -71,
            sequence: 3,
        }
    }

    #[test]
    fn test_reading_screen_lines() {
        let screen = reading_screen(&snapshot());
        assert_eq!(screen.line(0), "T:23.5C H:55%");
        assert_eq!(screen.line(1), "L:310lx G:120");
        assert_eq!(screen.line(2), "Env score: 65");
        assert_eq!(screen.line(3), "Pkt #3");
        assert_eq!(screen.line(4), "RSSI -71 dBm");
    }

    #[test]
    fn test_transmitter_screen_lines() {
        let stats = TxStats { sent: 12, send_failures: 1, skipped: 2 };
        let screen = transmitter_screen(&snapshot().reading, &stats);
        assert_eq!(screen.line(0), "T:23.5C H:55%");
        assert_eq!(screen.line(1), "L:310lx G:120");
        assert_eq!(screen.line(2), "Env score: 65");
        assert_eq!(screen.line(3), "Sent #12");
        assert_eq!(screen.line(4), "Fail 1 Skip 2");
    }

    #[test]
    fn test_startup_screen_for_transmitter() {
        let screen = startup_screen("LoRa TRANSMITTER", &RadioConfig::transmitter(), "Starting...");
        assert_eq!(screen.line(0), "LoRa TRANSMITTER");
        assert_eq!(screen.line(1), "Addr #1 915MHz");
        assert_eq!(screen.line(3), "Starting...");
    }

    #[test]
    fn test_missing_display_is_skipped() {
        #[derive(Default)]
        struct Count(usize);
        impl Display for Count {
            fn show(&mut self, _: &Screen) {
                self.0 += 1;
            }
        }

        let mut present = Some(Count::default());
        present.show(&message_screen("FATAL ERROR", "Sensor init failed"));
        assert_eq!(present.map(|c| c.0), Some(1));

        let mut absent: Option<Count> = None;
        absent.show(&message_screen("FATAL ERROR", "Sensor init failed"));
        assert!(absent.is_none());
    }

    #[test]
    fn test_waiting_screen_shows_address_and_band() {
        let screen = waiting_screen(&RadioConfig::receiver());
        assert_eq!(screen.line(0), "LoRa RECEIVER");
        assert_eq!(screen.line(1), "Addr #2 915MHz");
        assert_eq!(screen.line(3), "Waiting packets...");
    }

    #[test]
    fn test_long_lines_are_truncated() {
        let screen = message_screen("FATAL", "radio did not answer on the SPI bus");
        assert_eq!(screen.line(0), "FATAL");
        assert_eq!(screen.line(2).len(), LINE_LEN);
        assert!(screen.line(2).starts_with("radio did not answer"));
    }

    #[test]
    fn test_huge_values_do_not_panic() {
        let mut big = snapshot();
        big.reading.light = 1.0e30;
        big.signal_strength = i16::MIN;
        big.sequence = u32::MAX;
        let screen = reading_screen(&big);
        assert!(screen.line(1).len() <= LINE_LEN);
        assert_eq!(screen.line(3), "Pkt #4294967295");
    }
}
