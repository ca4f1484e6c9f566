use std::{sync::OnceLock, time::Instant};

use anyhow::Context;
use esp_idf_hal::{
    delay::FreeRtos,
    gpio::{AnyInputPin, AnyOutputPin, Input, InputPin, Output, OutputPin, PinDriver, Pull},
    peripherals::Peripherals,
    spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig},
    units::FromValueType,
};
use esp_idf_svc::log::EspLogger;
use log::{debug, info, warn};

use reflow_common::{
    max31855, ButtonInput, Buzzer, HeaterOutput, Indicator, OvenConfig, ReflowOven, SensorFault,
    StatusDisplay, Telemetry, TelemetryRecord, TemperatureSensor,
};

const SSR_PIN: i32 = 5;
const BUTTON_PIN: i32 = 0;

/// Reflow controller board: SSR, buzzer, LED, one push button and a
/// MAX31855 thermocouple amplifier on SPI2.
struct Board {
    ssr: PinDriver<'static, AnyOutputPin, Output>,
    buzzer: PinDriver<'static, AnyOutputPin, Output>,
    led: PinDriver<'static, AnyOutputPin, Output>,
    button: PinDriver<'static, AnyInputPin, Input>,
    thermocouple: SpiDeviceDriver<'static, SpiDriver<'static>>,
}

impl Board {
    fn new(peripherals: Peripherals) -> anyhow::Result<Self> {
        let pins = peripherals.pins;

        let ssr = PinDriver::output(pins.gpio5.downgrade_output())
            .with_context(|| format!("failed to claim SSR pin GPIO{SSR_PIN}"))?;
        let buzzer = PinDriver::output(pins.gpio18.downgrade_output())
            .context("failed to claim buzzer pin")?;
        let led = PinDriver::output(pins.gpio2.downgrade_output())
            .context("failed to claim status LED pin")?;

        // Active-low switch to ground.
        let mut button = PinDriver::input(pins.gpio0.downgrade_input())
            .with_context(|| format!("failed to claim button pin GPIO{BUTTON_PIN}"))?;
        button.set_pull(Pull::Up)?;

        let spi = SpiDriver::new(
            peripherals.spi2,
            pins.gpio14,
            pins.gpio13,
            Some(pins.gpio12),
            &SpiDriverConfig::new(),
        )
        .context("failed to initialize SPI bus")?;
        let thermocouple = SpiDeviceDriver::new(
            spi,
            Some(pins.gpio15),
            &SpiConfig::new().baudrate(4.MHz().into()),
        )
        .context("failed to attach MAX31855")?;

        Ok(Self {
            ssr,
            buzzer,
            led,
            button,
            thermocouple,
        })
    }
}

fn set_output(pin: &mut PinDriver<'static, AnyOutputPin, Output>, on: bool, name: &str) {
    let result = if on { pin.set_high() } else { pin.set_low() };
    if let Err(err) = result {
        warn!("failed to drive {name}: {err:?}");
    }
}

impl TemperatureSensor for Board {
    fn read_celsius(&mut self) -> Result<f32, SensorFault> {
        let mut frame = [0_u8; 4];
        if let Err(err) = self.thermocouple.read(&mut frame) {
            // No frame means no probe we can trust.
            warn!("MAX31855 read failed: {err:?}");
            return Err(SensorFault::Open);
        }
        let frame = max31855::frame_from_bytes(frame);
        debug!(
            "MAX31855 cold junction {:.2}C",
            max31855::cold_junction_celsius(frame)
        );
        max31855::decode(frame)
    }
}

impl HeaterOutput for Board {
    fn set_energized(&mut self, energized: bool) {
        set_output(&mut self.ssr, energized, "SSR");
    }
}

impl Buzzer for Board {
    fn set_buzzer(&mut self, on: bool) {
        set_output(&mut self.buzzer, on, "buzzer");
    }
}

impl Indicator for Board {
    fn set_indicator(&mut self, on: bool) {
        set_output(&mut self.led, on, "status LED");
    }
}

impl ButtonInput for Board {
    fn is_pressed(&mut self) -> bool {
        self.button.is_low()
    }
}

impl StatusDisplay for Board {
    fn show_splash(&mut self) {
        info!("[lcd] Reflow / Oven {}", env!("CARGO_PKG_VERSION"));
    }

    fn show(&mut self, phase_label: &str, reading: &str) {
        info!("[lcd] {phase_label} | {reading}");
    }
}

impl Telemetry for Board {
    fn record(&mut self, record: &TelemetryRecord) {
        match serde_json::to_string(record) {
            Ok(line) => info!(target: "telemetry", "{line}"),
            Err(err) => warn!("telemetry serialization failed: {err}"),
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    EspLogger::initialize_default();

    let config = OvenConfig::default();
    config
        .validate()
        .context("invalid built-in oven configuration")?;

    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let board = Board::new(peripherals).context("failed to initialize board")?;
    let mut oven = ReflowOven::new(board, &config, monotonic_ms());

    info!("reflow controller ready");

    loop {
        oven.poll(monotonic_ms());
        // Yield one tick so the idle task can feed its watchdog.
        FreeRtos::delay_ms(1);
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
