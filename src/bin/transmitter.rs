#![no_std]
#![no_main]

use core::cell::RefCell;

use bme680::I2CAddress;
use bsp::entry;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal_0_2::adc::{Channel, OneShot};
use embedded_hal_bus::{i2c::RefCellDevice, spi::ExclusiveDevice};
use panic_probe as _;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::{
    adc::{Adc, AdcPin},
    clocks::{init_clocks_and_plls, Clock},
    fugit::RateExtU32,
    gpio::{FunctionI2C, FunctionSpi, Pin, PinState, PullUp},
    pac,
    spi::Spi,
    watchdog::Watchdog,
    Sio, Timer, I2C,
};
use envlink::config::{RadioConfig, MAIN_LOOP_TICK_MS, RECEIVER_ADDRESS};
use envlink::radio::Sx127x;
use envlink::rendering::{message_screen, startup_screen, transmitter_screen, Display, OledScreen};
use envlink::sensors::{gas_proxy_from_adc, Bh1750, Bme680Climate, EnvironmentSensors, SensorKind};
use envlink::{EnvironmentModel, SensorError, Transmitter};
use ssd1306::I2CDisplayInterface;

/// Everything the sensor node measures
/// BME680 on I2C0, BH1750 on I2C1 (shared with the OLED), gas proxy on ADC0
struct Board<C, L, P> {
    climate: Bme680Climate<C, Timer>,
    light: Bh1750<L>,
    adc: Adc,
    gas_pin: P,
}

impl<C, L, P> EnvironmentSensors for Board<C, L, P>
where
    C: embedded_hal_0_2::blocking::i2c::Read + embedded_hal_0_2::blocking::i2c::Write,
    L: embedded_hal::i2c::I2c,
    P: Channel<Adc, ID = u8>,
    Adc: OneShot<Adc, u16, P>,
{
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError> {
        self.climate.measure()
    }

    fn read_light(&mut self) -> Result<f32, SensorError> {
        self.light.read_lux()
    }

    fn read_gas(&mut self) -> Result<f32, SensorError> {
        let raw: Result<u16, _> = self.adc.read(&mut self.gas_pin);
        raw.map(gas_proxy_from_adc)
            .map_err(|_| SensorError::Conversion(SensorKind::Gas))
    }
}

/// Shows the fault on the panel, then blinks the on-board LED forever
/// param display: status panel, if it came up
/// param led: on-board LED pin
/// param delay: Timer instance
/// param message: fault shown on the panel
fn halt<D: Display, P: OutputPin>(display: &mut D, led: &mut P, delay: &mut Timer, message: &str) -> ! {
    error!("{}", message);
    display.show(&message_screen("FATAL ERROR", message));
    loop {
        let _ = led.set_high();
        delay.delay_ms(500);
        let _ = led.set_low();
        delay.delay_ms(1000);
    }
}

#[entry]
fn main() -> ! {
    info!("Transmitter starting");
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    // The default is to generate a 125 MHz system clock
    let clocks = init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    let sio = Sio::new(pac.SIO);
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut delay = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let mut led = pins.led.into_push_pull_output();

    // I2C1 carries the OLED and the BH1750
    let sda1: Pin<_, FunctionI2C, PullUp> = pins.gpio2.reconfigure();
    let scl1: Pin<_, FunctionI2C, PullUp> = pins.gpio3.reconfigure();
    let i2c1 = I2C::i2c1(pac.I2C1, sda1, scl1, 400.kHz(), &mut pac.RESETS, &clocks.system_clock);
    let i2c1_bus = RefCell::new(i2c1);

    // A missing panel is not fatal, the LED still reports faults
    let mut display = match OledScreen::new(I2CDisplayInterface::new(RefCellDevice::new(&i2c1_bus))) {
        Ok(display) => Some(display),
        Err(_) => {
            warn!("Display init failed, continuing without it");
            None
        }
    };

    let config = RadioConfig::transmitter();
    display.show(&startup_screen("LoRa TRANSMITTER", &config, "Starting..."));
    if let Err(e) = config.validate() {
        error!("Bad radio configuration: {}", e);
        halt(&mut display, &mut led, &mut delay, "Bad radio config");
    }

    // Set up BME680 on I2C0
    let sda0: Pin<_, FunctionI2C, PullUp> = pins.gpio0.reconfigure();
    let scl0: Pin<_, FunctionI2C, PullUp> = pins.gpio1.reconfigure();
    let i2c0 = I2C::i2c0(pac.I2C0, sda0, scl0, 100.kHz(), &mut pac.RESETS, &clocks.system_clock);
    let climate = match Bme680Climate::init(i2c0, delay, I2CAddress::Secondary) {
        Ok(climate) => climate,
        Err(e) => {
            error!("BME680 init failed: {}", e);
            halt(&mut display, &mut led, &mut delay, "Sensor init failed");
        }
    };

    let mut light = Bh1750::new(RefCellDevice::new(&i2c1_bus));
    if let Err(e) = light.init(&mut delay) {
        error!("BH1750 init failed: {}", e);
        halt(&mut display, &mut led, &mut delay, "Sensor init failed");
    }

    // Gas sensor analog output on GPIO26 / ADC0
    let adc = Adc::new(pac.ADC, &mut pac.RESETS);
    let Ok(gas_pin) = AdcPin::new(pins.gpio26.into_floating_input()) else {
        halt(&mut display, &mut led, &mut delay, "Gas ADC pin invalid");
    };

    // Set up SX127x on SPI0
    let mosi = pins.gpio19.into_function::<FunctionSpi>();
    let miso = pins.gpio16.into_function::<FunctionSpi>();
    let sclk = pins.gpio18.into_function::<FunctionSpi>();
    let spi_bus = Spi::<_, _, _, 8>::new(pac.SPI0, (mosi, miso, sclk)).init(
        &mut pac.RESETS,
        clocks.peripheral_clock.freq(),
        5.MHz(),
        embedded_hal::spi::MODE_0,
    );
    let cs = pins.gpio17.into_push_pull_output_in_state(PinState::High);
    let Ok(spi) = ExclusiveDevice::new(spi_bus, cs, delay) else {
        halt(&mut display, &mut led, &mut delay, "LoRa init failed");
    };
    let reset = pins.gpio20.into_push_pull_output_in_state(PinState::High);
    let mut radio = Sx127x::new(spi, reset, delay, config);
    if let Err(e) = radio.init() {
        error!("LoRa init failed: {}", e);
        halt(&mut display, &mut led, &mut delay, "LoRa init failed");
    }

    let model = match EnvironmentModel::new() {
        Ok(model) => model,
        Err(e) => {
            error!("Model load failed: {}", e);
            halt(&mut display, &mut led, &mut delay, "Model load failed");
        }
    };

    let board = Board { climate, light, adc, gas_pin };
    let mut transmitter = Transmitter::new(board, radio, model, RECEIVER_ADDRESS);
    info!("Transmitter ready, address #{}", config.address);
    display.show(&startup_screen("LoRa TRANSMITTER", &config, "Ready"));

    let mut reported = 0;
    loop {
        match transmitter.tick(MAIN_LOOP_TICK_MS) {
            Ok(Some(outcome)) => {
                if let Some(reading) = outcome.reading() {
                    display.show(&transmitter_screen(&reading, &transmitter.stats()));
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("Could not encode reading: {}", e);
                halt(&mut display, &mut led, &mut delay, "Encode failed");
            }
        }

        // Link summary once a minute
        let stats = transmitter.stats();
        if stats.sent != reported && stats.sent % 60 == 0 {
            info!("{}", stats);
            reported = stats.sent;
        }

        delay.delay_ms(MAIN_LOOP_TICK_MS);
    }
}
