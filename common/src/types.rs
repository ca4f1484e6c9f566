use serde::{Deserialize, Serialize};

use crate::error::SensorFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReflowPhase {
    Idle,
    Preheat,
    Soak,
    Reflow,
    Peak,
    Cool,
    Complete,
    TooHot,
    Error,
}

impl ReflowPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Preheat => "PREHEAT",
            Self::Soak => "SOAK",
            Self::Reflow => "REFLOW",
            Self::Peak => "PEAK",
            Self::Cool => "COOL",
            Self::Complete => "COMPLETE",
            Self::TooHot => "TOO_HOT",
            Self::Error => "ERROR",
        }
    }

    /// Text shown on the first display line.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Preheat => "Preheat",
            Self::Soak => "Soak",
            Self::Reflow => "Reflow",
            Self::Peak => "Peak",
            Self::Cool => "Cool",
            Self::Complete => "Complete",
            Self::TooHot => "Wait,hot",
            Self::Error => "Error",
        }
    }

    /// The oven is on only while a heating phase of the profile is running.
    pub fn oven_status(self) -> OvenStatus {
        match self {
            Self::Preheat | Self::Soak | Self::Reflow | Self::Peak => OvenStatus::On,
            Self::Idle | Self::Cool | Self::Complete | Self::TooHot | Self::Error => {
                OvenStatus::Off
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OvenStatus {
    On,
    Off,
}

impl OvenStatus {
    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

/// Captured on every phase transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseContext {
    pub start_ms: u64,
    pub start_temp_c: f32,
}

impl PhaseContext {
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureSample {
    Celsius(f32),
    Fault(SensorFault),
}

impl TemperatureSample {
    pub fn celsius(self) -> Option<f32> {
        match self {
            Self::Celsius(temp_c) => Some(temp_c),
            Self::Fault(_) => None,
        }
    }

    pub fn fault(self) -> Option<SensorFault> {
        match self {
            Self::Celsius(_) => None,
            Self::Fault(fault) => Some(fault),
        }
    }

    /// Second display line: the reading, or a fault notice.
    pub fn display_text(self) -> String {
        match self {
            Self::Celsius(temp_c) => format!("{temp_c:.2}C"),
            Self::Fault(_) => "TC Error".to_string(),
        }
    }
}

impl From<Result<f32, SensorFault>> for TemperatureSample {
    fn from(reading: Result<f32, SensorFault>) -> Self {
        match reading {
            Ok(temp_c) => Self::Celsius(temp_c),
            Err(fault) => Self::Fault(fault),
        }
    }
}

/// Validated button signal, live for a single loop iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonEvent {
    #[default]
    None,
    Pressed,
}

impl ButtonEvent {
    pub fn is_pressed(self) -> bool {
        self == Self::Pressed
    }

    /// Consumes the event, leaving `None` behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// One telemetry line, emitted once per display interval while the oven is on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    #[serde(rename = "elapsedS")]
    pub elapsed_s: u32,
    #[serde(rename = "temperatureC")]
    pub temperature_c: f32,
    pub phase: &'static str,
    pub heater: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OvenSnapshot {
    pub phase: &'static str,
    pub label: &'static str,
    pub status: &'static str,
    #[serde(rename = "temperatureC")]
    pub temperature_c: Option<f32>,
    pub fault: Option<&'static str>,
    pub heater: bool,
    pub buzzer: bool,
    #[serde(rename = "phaseElapsedMs")]
    pub phase_elapsed_ms: u64,
}
