use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::SensorError;
use crate::reading::RawSample;

#[cfg(feature = "rp2040")]
pub use self::climate::Bme680Climate;

/// Full-scale value of the RP2040's 12-bit ADC
pub const ADC_FULL_SCALE: u16 = 4095;
/// Gas proxy reported at full scale
pub const GAS_PROXY_MAX: f32 = 300.0;

/// Which sensor a reading or failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    /// Temperature and humidity
    Climate,
    Light,
    Gas,
}

impl SensorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Climate => "climate",
            Self::Light => "light",
            Self::Gas => "gas",
        }
    }
}

/// Blocking access to every sensor on the transmitter
pub trait EnvironmentSensors {
    /// Temperature in °C and relative humidity in %
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError>;

    /// Illuminance in lux
    fn read_light(&mut self) -> Result<f32, SensorError>;

    /// Gas proxy, 0-300
    fn read_gas(&mut self) -> Result<f32, SensorError>;

    /// Reads every sensor once. Stops at the first failure.
    fn sample(&mut self) -> Result<RawSample, SensorError> {
        let (temperature, humidity) = self.read_climate()?;
        let light = self.read_light()?;
        let gas = self.read_gas()?;
        Ok(RawSample { temperature, humidity, light, gas })
    }
}

/// Converts a raw ADC count into the gas proxy
/// param raw: 12-bit ADC sample, clamped to full scale
pub fn gas_proxy_from_adc(raw: u16) -> f32 {
    f32::from(raw.min(ADC_FULL_SCALE)) / f32::from(ADC_FULL_SCALE) * GAS_PROXY_MAX
}

// ============================================================================
// BH1750
// ============================================================================

const BH1750_POWER_ON: u8 = 0x01;
const BH1750_CONTINUOUS_HIGH_RES: u8 = 0x10;
/// Worst-case high resolution conversion time
const BH1750_CONVERSION_MS: u32 = 180;

/// BH1750 ambient light sensor in continuous high resolution mode
pub struct Bh1750<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Bh1750<I2C> {
    /// ADDR pin low
    pub const DEFAULT_ADDRESS: u8 = 0x23;

    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, Self::DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Powers the sensor on, starts continuous measurement and waits for
    /// the first conversion
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), SensorError> {
        self.command(BH1750_POWER_ON)?;
        self.command(BH1750_CONTINUOUS_HIGH_RES)?;
        delay.delay_ms(BH1750_CONVERSION_MS);
        Ok(())
    }

    /// Latest conversion, in lux
    pub fn read_lux(&mut self) -> Result<f32, SensorError> {
        let mut raw = [0u8; 2];
        self.i2c
            .read(self.address, &mut raw)
            .map_err(|_| SensorError::Bus(SensorKind::Light))?;
        Ok(f32::from(u16::from_be_bytes(raw)) / 1.2)
    }

    fn command(&mut self, opcode: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[opcode])
            .map_err(|_| SensorError::Bus(SensorKind::Light))
    }
}

// ============================================================================
// BME680
// ============================================================================

#[cfg(feature = "rp2040")]
mod climate {
    use bme680::{
        Bme680, FieldDataCondition, I2CAddress, IIRFilterSize, OversamplingSetting, PowerMode,
        SettingsBuilder,
    };
    use embedded_hal_0_2::blocking::delay::DelayMs;
    use embedded_hal_0_2::blocking::i2c::{Read, Write};

    use super::SensorKind;
    use crate::error::SensorError;

    /// BME680 used for temperature and humidity only; the gas heater is off
    pub struct Bme680Climate<I2C, D> {
        bme: Bme680<I2C, D>,
        delay: D,
    }

    impl<I2C, D> Bme680Climate<I2C, D>
    where
        I2C: Read + Write,
        D: DelayMs<u8>,
    {
        pub fn init(i2c: I2C, mut delay: D, address: I2CAddress) -> Result<Self, SensorError> {
            let mut bme = Bme680::init(i2c, &mut delay, address)
                .map_err(|_| SensorError::Bus(SensorKind::Climate))?;
            let settings = SettingsBuilder::new()
                .with_humidity_oversampling(OversamplingSetting::OS2x)
                .with_temperature_oversampling(OversamplingSetting::OS8x)
                .with_temperature_filter(IIRFilterSize::Size3)
                .with_run_gas(false)
                .build();
            bme.set_sensor_settings(&mut delay, settings)
                .map_err(|_| SensorError::Bus(SensorKind::Climate))?;
            Ok(Self { bme, delay })
        }

        /// Runs one forced-mode measurement
        pub fn measure(&mut self) -> Result<(f32, f32), SensorError> {
            self.bme
                .set_sensor_mode(&mut self.delay, PowerMode::ForcedMode)
                .map_err(|_| SensorError::Bus(SensorKind::Climate))?;
            let (data, condition) = self
                .bme
                .get_sensor_data(&mut self.delay)
                .map_err(|_| SensorError::Bus(SensorKind::Climate))?;
            if matches!(condition, FieldDataCondition::Unchanged) {
                return Err(SensorError::Conversion(SensorKind::Climate));
            }
            let temperature = data.temperature_celsius();
            let humidity = data.humidity_percent();
            if !temperature.is_finite() || !humidity.is_finite() {
                return Err(SensorError::Conversion(SensorKind::Climate));
            }
            Ok((temperature, humidity))
        }
    }
}
