pub mod config;
pub mod debounce;
pub mod error;
pub mod max31855;
pub mod oven;
pub mod ports;
pub mod reflow;
pub mod timer;
pub mod types;

pub use config::{OvenConfig, ReflowProfile, TimingConfig};
pub use debounce::{DebounceState, Debouncer};
pub use error::{ConfigError, SensorFault};
pub use oven::ReflowOven;
pub use ports::{
    ButtonInput, Buzzer, HeaterOutput, Indicator, OvenIo, StatusDisplay, Telemetry,
    TemperatureSensor,
};
pub use reflow::{ramp_allows_heat, ReflowEngine};
pub use timer::PeriodicTimer;
pub use types::{
    ButtonEvent, OvenSnapshot, OvenStatus, PhaseContext, ReflowPhase, TelemetryRecord,
    TemperatureSample,
};
