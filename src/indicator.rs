use embedded_hal::digital::OutputPin;

/// Receiver status shown on the RGB LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorColor {
    /// Yellow while peripherals come up
    Starting,
    /// Blue, waiting for packets
    Idle,
    /// Green, packet received
    Activity,
    /// Red, fatal error
    Fault,
}

impl IndicatorColor {
    /// Channel levels as (red, green, blue)
    pub const fn rgb(self) -> (bool, bool, bool) {
        match self {
            Self::Starting => (true, true, false),
            Self::Idle => (false, false, true),
            Self::Activity => (false, true, false),
            Self::Fault => (true, false, false),
        }
    }
}

/// Anything that can show an [`IndicatorColor`]
pub trait Indicator {
    fn show(&mut self, color: IndicatorColor);
}

/// Common-cathode RGB LED on three GPIOs
pub struct RgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> RgbLed<R, G, B> {
    pub fn new(red: R, green: G, blue: B) -> Self {
        Self { red, green, blue }
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) {
    // A failed GPIO write leaves the previous color; nothing better to do
    let _ = if high { pin.set_high() } else { pin.set_low() };
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> Indicator for RgbLed<R, G, B> {
    fn show(&mut self, color: IndicatorColor) {
        let (red, green, blue) = color.rgb();
        drive(&mut self.red, red);
        drive(&mut self.green, green);
        drive(&mut self.blue, blue);
    }
}
