//! Wire format of the radio payload
//!
//! A packet is one ASCII line without terminator:
//!
//! ```text
//! E:<score>,T:<temperature>,H:<humidity>,L:<light>,G:<gas>
//! E:42,T:23.5,H:55,L:310,G:120
//! ```
//!
//! Temperature carries one decimal, everything else is rounded to whole
//! units. The radio frame supplies the length, so there is no prefix.

use core::fmt::Write;

use heapless::String;

use crate::config::MAX_PAYLOAD;
use crate::error::{DecodeError, DecodeErrorKind, EncodeError};
use crate::reading::SensorReading;

/// An encoded packet, bounded by the radio payload size
pub type Packet = String<MAX_PAYLOAD>;

/// Packet fields, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Environment,
    Temperature,
    Humidity,
    Light,
    Gas,
}

impl Field {
    pub const ORDER: [Field; 5] = [
        Field::Environment,
        Field::Temperature,
        Field::Humidity,
        Field::Light,
        Field::Gas,
    ];

    /// Single-letter key on the wire
    pub fn key(self) -> u8 {
        match self {
            Self::Environment => b'E',
            Self::Temperature => b'T',
            Self::Humidity => b'H',
            Self::Light => b'L',
            Self::Gas => b'G',
        }
    }

    fn value(self, reading: &SensorReading) -> f32 {
        match self {
            Self::Environment => reading.environment_score,
            Self::Temperature => reading.temperature,
            Self::Humidity => reading.humidity,
            Self::Light => reading.light,
            Self::Gas => reading.gas,
        }
    }
}

/// Format `reading` as a packet.
///
/// Fails instead of truncating when the text does not fit, and refuses
/// NaN or infinite values the receiver could not parse back.
pub fn encode(reading: &SensorReading) -> Result<Packet, EncodeError> {
    if let Some(field) = Field::ORDER.into_iter().find(|f| !f.value(reading).is_finite()) {
        return Err(EncodeError::NonFinite { field });
    }

    let mut packet = Packet::new();
    write!(
        packet,
        "E:{:.0},T:{:.1},H:{:.0},L:{:.0},G:{:.0}",
        reading.environment_score, reading.temperature, reading.humidity, reading.light, reading.gas
    )
    .map_err(|_| EncodeError::PayloadTooLarge { maximum: MAX_PAYLOAD })?;

    Ok(packet)
}

/// Parse a received frame.
///
/// All five fields must be present, in order, with numeric values.
/// Anything after the last value is ignored.
pub fn decode(frame: &[u8]) -> Result<SensorReading, DecodeError> {
    let mut scanner = Scanner { bytes: frame, pos: 0, parsed: 0 };

    let environment_score = scanner.field(Field::Environment)?;
    let temperature = scanner.field(Field::Temperature)?;
    let humidity = scanner.field(Field::Humidity)?;
    let light = scanner.field(Field::Light)?;
    let gas = scanner.field(Field::Gas)?;

    Ok(SensorReading { temperature, humidity, light, gas, environment_score })
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    parsed: u8,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn fail(&self, field: Field, kind: DecodeErrorKind) -> DecodeError {
        DecodeError { field, parsed: self.parsed, kind }
    }

    /// `KEY:value` followed by `,` unless this is the last field
    fn field(&mut self, field: Field) -> Result<f32, DecodeError> {
        match self.peek() {
            None => return Err(self.fail(field, DecodeErrorKind::MissingField)),
            Some(found) if found != field.key() => {
                return Err(self.fail(field, DecodeErrorKind::UnexpectedKey { found }));
            }
            Some(_) => self.pos += 1,
        }

        if self.peek() != Some(b':') {
            return Err(self.fail(field, DecodeErrorKind::MissingColon));
        }
        self.pos += 1;

        let value = self
            .number()
            .ok_or_else(|| self.fail(field, DecodeErrorKind::MalformedValue))?;

        if field != Field::Gas {
            if self.peek() != Some(b',') {
                return Err(self.fail(field, DecodeErrorKind::MissingSeparator));
            }
            self.pos += 1;
        }

        self.parsed += 1;
        Ok(value)
    }

    /// Longest `[+-]digits[.digits][e[+-]digits]` prefix after optional
    /// ASCII whitespace, parsed as f32
    fn number(&mut self) -> Option<f32> {
        let start = self.pos + self.whitespace_from(self.pos);
        let mut end = start;

        if matches!(self.bytes.get(end), Some(b'+' | b'-')) {
            end += 1;
        }

        let int_digits = self.digits_from(end);
        end += int_digits;

        let mut frac_digits = 0;
        if self.bytes.get(end) == Some(&b'.') {
            frac_digits = self.digits_from(end + 1);
            end += 1 + frac_digits;
        }

        if int_digits + frac_digits == 0 {
            return None;
        }

        // Exponent only counts when digits follow it
        if matches!(self.bytes.get(end), Some(b'e' | b'E')) {
            let mut exp = end + 1;
            if matches!(self.bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_digits = self.digits_from(exp);
            if exp_digits > 0 {
                end = exp + exp_digits;
            }
        }

        let text = core::str::from_utf8(&self.bytes[start..end]).ok()?;
        let value: f32 = text.parse().ok()?;
        if !value.is_finite() {
            return None;
        }

        self.pos = end;
        Some(value)
    }

    fn whitespace_from(&self, at: usize) -> usize {
        self.bytes
            .get(at..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_whitespace()).count())
    }

    fn digits_from(&self, at: usize) -> usize {
        self.bytes
            .get(at..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
    }
}
