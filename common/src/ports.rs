//! Board collaborators driven by the control loop.

use crate::{error::SensorFault, types::TelemetryRecord};

pub trait TemperatureSensor {
    fn read_celsius(&mut self) -> Result<f32, SensorFault>;
}

/// Solid-state relay feeding the heating element.
pub trait HeaterOutput {
    fn set_energized(&mut self, energized: bool);
}

pub trait Buzzer {
    fn set_buzzer(&mut self, on: bool);
}

/// Status LED.
pub trait Indicator {
    fn set_indicator(&mut self, on: bool);
}

pub trait ButtonInput {
    /// Raw, undebounced level: `true` while the switch reads closed.
    fn is_pressed(&mut self) -> bool;
}

pub trait StatusDisplay {
    fn show_splash(&mut self);
    fn show(&mut self, phase_label: &str, reading: &str);
}

pub trait Telemetry {
    fn record(&mut self, record: &TelemetryRecord);
}

/// Everything the loop needs from one board.
pub trait OvenIo:
    TemperatureSensor + HeaterOutput + Buzzer + Indicator + ButtonInput + StatusDisplay + Telemetry
{
}

impl<T> OvenIo for T where
    T: TemperatureSensor
        + HeaterOutput
        + Buzzer
        + Indicator
        + ButtonInput
        + StatusDisplay
        + Telemetry
{
}
