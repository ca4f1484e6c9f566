use thiserror::Error;

/// Wiring faults reported by the thermocouple amplifier in place of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorFault {
    #[error("thermocouple open circuit")]
    Open,
    #[error("thermocouple shorted to ground")]
    ShortToGround,
    #[error("thermocouple shorted to supply")]
    ShortToSupply,
}

impl SensorFault {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::ShortToGround => "SHORT_GND",
            Self::ShortToSupply => "SHORT_VCC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("ramp rate must be a positive finite number, got {0}")]
    InvalidRampRate(f32),
    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),
    #[error("{0} must be a finite temperature")]
    NonFiniteTemperature(&'static str),
    #[error("profile temperatures must satisfy room < cool < soak < peak")]
    UnorderedProfile,
}
