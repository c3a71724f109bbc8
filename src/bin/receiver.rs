#![no_std]
#![no_main]

use core::cell::RefCell;

use bsp::entry;
use critical_section::Mutex;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal_bus::spi::ExclusiveDevice;
use panic_probe as _;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::{
    self,
    clocks::{init_clocks_and_plls, Clock},
    fugit::RateExtU32,
    gpio::{
        self,
        bank0::{Gpio16, Gpio17, Gpio18, Gpio19, Gpio20, Gpio21},
        FunctionI2C, FunctionSioInput, FunctionSioOutput, FunctionSpi, Pin, PinState, PullDown,
        PullUp,
    },
    pac::{self, interrupt},
    spi::{Enabled, Spi},
    watchdog::Watchdog,
    Sio, Timer, I2C,
};
use envlink::config::{RadioConfig, MAIN_LOOP_TICK_MS};
use envlink::indicator::{Indicator, IndicatorColor, RgbLed};
use envlink::radio::Sx127x;
use envlink::rendering::OledScreen;
use envlink::session::service_radio;
use envlink::{Receiver, TelemetryCell};
use ssd1306::I2CDisplayInterface;

type RadioBus = Spi<
    Enabled,
    pac::SPI0,
    (
        Pin<Gpio19, FunctionSpi, PullDown>,
        Pin<Gpio16, FunctionSpi, PullDown>,
        Pin<Gpio18, FunctionSpi, PullDown>,
    ),
    8,
>;
type RadioSpi = ExclusiveDevice<RadioBus, Pin<Gpio17, FunctionSioOutput, PullDown>, Timer>;
type Radio = Sx127x<RadioSpi, Pin<Gpio20, FunctionSioOutput, PullDown>, Timer>;
type Dio0 = Pin<Gpio21, FunctionSioInput, PullDown>;

/// Radio and its DIO0 line, handed to the interrupt once configured
static RADIO: Mutex<RefCell<Option<(Radio, Dio0)>>> = Mutex::new(RefCell::new(None));
/// Latest reading, written by the interrupt and taken by the main loop
static TELEMETRY: TelemetryCell = TelemetryCell::new();

/// Idles forever once the fault state is shown
fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

#[entry]
fn main() -> ! {
    info!("Receiver starting");
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

    // Status LED: red, green, blue
    let mut led = RgbLed::new(
        pins.gpio13.into_push_pull_output(),
        pins.gpio11.into_push_pull_output(),
        pins.gpio12.into_push_pull_output(),
    );
    led.show(IndicatorColor::Starting);

    // Set up SSD1306 on I2C1
    let sda: Pin<_, FunctionI2C, PullUp> = pins.gpio14.reconfigure();
    let scl: Pin<_, FunctionI2C, PullUp> = pins.gpio15.reconfigure();
    let i2c = I2C::i2c1(pac.I2C1, sda, scl, 400.kHz(), &mut pac.RESETS, &clocks.system_clock);
    let screen = match OledScreen::new(I2CDisplayInterface::new(i2c)) {
        Ok(screen) => screen,
        Err(_) => {
            error!("Display init failed");
            led.show(IndicatorColor::Fault);
            halt();
        }
    };

    let config = RadioConfig::receiver();
    let mut receiver = Receiver::new(screen, led, config);
    if let Err(e) = config.validate() {
        error!("Bad radio configuration: {}", e);
        receiver.fail("Bad radio config");
        halt();
    }

    // Set up SX127x on SPI0
    let mosi = pins.gpio19.into_function::<FunctionSpi>();
    let miso = pins.gpio16.into_function::<FunctionSpi>();
    let sclk = pins.gpio18.into_function::<FunctionSpi>();
    let spi_bus: RadioBus = Spi::new(pac.SPI0, (mosi, miso, sclk)).init(
        &mut pac.RESETS,
        clocks.peripheral_clock.freq(),
        5.MHz(),
        embedded_hal::spi::MODE_0,
    );
    let cs = pins.gpio17.into_push_pull_output_in_state(PinState::High);
    let Ok(spi) = ExclusiveDevice::new(spi_bus, cs, delay) else {
        receiver.fail("SPI setup failed");
        halt();
    };
    let reset = pins.gpio20.into_push_pull_output_in_state(PinState::High);
    let mut radio: Radio = Sx127x::new(spi, reset, delay, config);
    if let Err(e) = radio.init().and_then(|()| radio.listen()) {
        error!("LoRa init failed: {}", e);
        receiver.fail("LoRa init failed");
        halt();
    }

    // DIO0 goes high on RxDone
    let dio0: Dio0 = pins.gpio21.into_pull_down_input();
    dio0.set_interrupt_enabled(gpio::Interrupt::EdgeHigh, true);
    critical_section::with(|cs| RADIO.borrow(cs).replace(Some((radio, dio0))));
    // SAFETY: the handler only touches RADIO and TELEMETRY, both set up above
    unsafe {
        pac::NVIC::unmask(hal::pac::Interrupt::IO_IRQ_BANK0);
    }

    receiver.start();

    loop {
        if let Some(snapshot) = receiver.tick(&TELEMETRY, MAIN_LOOP_TICK_MS) {
            if snapshot.sequence % 10 == 0 {
                info!("{}", TELEMETRY.stats());
            }
        }
        delay.delay_ms(MAIN_LOOP_TICK_MS);
    }
}

#[interrupt]
fn IO_IRQ_BANK0() {
    static mut LINK: Option<(Radio, Dio0)> = None;

    // Move the radio in on the first interrupt
    if LINK.is_none() {
        critical_section::with(|cs| *LINK = RADIO.borrow(cs).take());
    }

    if let Some((radio, dio0)) = LINK {
        if dio0.interrupt_status(gpio::Interrupt::EdgeHigh) {
            if let Err(e) = service_radio(radio, &TELEMETRY) {
                warn!("Frame dropped: {}", e);
            }
            dio0.clear_interrupt(gpio::Interrupt::EdgeHigh);
        }
    }
}
