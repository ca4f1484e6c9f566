use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Temperature-vs-time profile, Celsius and milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflowProfile {
    pub room_temp_c: f32,
    pub soak_temp_c: f32,
    pub soak_period_ms: u64,
    pub peak_temp_c: f32,
    pub peak_period_ms: u64,
    pub cool_temp_c: f32,
    /// Maximum rise in °C per second while ramping (Preheat, Reflow).
    pub ramp_rate_c_per_s: f32,
}

impl Default for ReflowProfile {
    fn default() -> Self {
        Self {
            room_temp_c: 50.0,
            soak_temp_c: 150.0,
            soak_period_ms: 90_000,
            peak_temp_c: 237.0,
            peak_period_ms: 50_000,
            cool_temp_c: 100.0,
            ramp_rate_c_per_s: 3.0,
        }
    }
}

impl ReflowProfile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let temps = [
            ("room_temp_c", self.room_temp_c),
            ("cool_temp_c", self.cool_temp_c),
            ("soak_temp_c", self.soak_temp_c),
            ("peak_temp_c", self.peak_temp_c),
        ];
        for (name, value) in temps {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteTemperature(name));
            }
        }
        if !(self.room_temp_c < self.cool_temp_c
            && self.cool_temp_c < self.soak_temp_c
            && self.soak_temp_c < self.peak_temp_c)
        {
            return Err(ConfigError::UnorderedProfile);
        }
        if !self.ramp_rate_c_per_s.is_finite() || self.ramp_rate_c_per_s <= 0.0 {
            return Err(ConfigError::InvalidRampRate(self.ramp_rate_c_per_s));
        }
        if self.soak_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("soak_period_ms"));
        }
        if self.peak_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("peak_period_ms"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub sensor_interval_ms: u64,
    pub display_interval_ms: u64,
    pub debounce_ms: u64,
    pub buzzer_ms: u64,
    /// Time the splash screen stays up before the first status refresh.
    pub splash_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sensor_interval_ms: 200,
            display_interval_ms: 1_000,
            debounce_ms: 50,
            buzzer_ms: 1_000,
            splash_ms: 2_500,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_interval_ms == 0 {
            return Err(ConfigError::ZeroPeriod("sensor_interval_ms"));
        }
        if self.display_interval_ms == 0 {
            return Err(ConfigError::ZeroPeriod("display_interval_ms"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OvenConfig {
    #[serde(default)]
    pub profile: ReflowProfile,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl OvenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.profile.validate()?;
        self.timing.validate()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
