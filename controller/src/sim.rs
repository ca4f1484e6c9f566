use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use reflow_common::{
    ButtonInput, Buzzer, HeaterOutput, Indicator, SensorFault, StatusDisplay, Telemetry,
    TelemetryRecord, TemperatureSensor,
};
use tracing::{debug, info, warn};

/// A simulated press stays down for at least this many button samples, so
/// the debouncer sees it confirmed and then released at any loop rate.
const MIN_PRESS_SAMPLES: u32 = 3;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub ambient_c: f32,
    /// Temperature gain per second with the element energized.
    pub heater_c_per_s: f32,
    /// Fraction of the excess over ambient lost per second.
    pub loss_per_s: f32,
    pub fault_at_ms: Option<u64>,
    pub fault_clear_ms: Option<u64>,
    pub press_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            heater_c_per_s: 4.0,
            loss_per_s: 0.01,
            fault_at_ms: None,
            fault_clear_ms: None,
            press_ms: 100,
        }
    }
}

/// Toaster oven with a first-order thermal model, standing in for the board.
pub struct SimulatedOven {
    config: SimConfig,
    temp_c: f32,
    now_ms: u64,

    heater: bool,
    buzzer: bool,
    indicator: bool,

    press_requests: Arc<AtomicUsize>,
    press_until_ms: Option<u64>,
    press_samples: u32,

    last_screen: Option<(String, String)>,
}

impl SimulatedOven {
    pub fn new(config: SimConfig, press_requests: Arc<AtomicUsize>) -> Self {
        Self {
            temp_c: config.ambient_c,
            config,
            now_ms: 0,
            heater: false,
            buzzer: false,
            indicator: false,
            press_requests,
            press_until_ms: None,
            press_samples: 0,
            last_screen: None,
        }
    }

    pub fn temperature_c(&self) -> f32 {
        self.temp_c
    }

    pub fn heater_on(&self) -> bool {
        self.heater
    }

    /// Integrates the thermal model up to `now_ms`.
    pub fn advance(&mut self, now_ms: u64) {
        let dt_s = now_ms.saturating_sub(self.now_ms) as f32 / 1000.0;
        self.now_ms = now_ms.max(self.now_ms);

        let gain = if self.heater {
            self.config.heater_c_per_s
        } else {
            0.0
        };
        let loss = self.config.loss_per_s * (self.temp_c - self.config.ambient_c);
        self.temp_c += dt_s * (gain - loss);
    }

    fn fault_active(&self) -> bool {
        let Some(start) = self.config.fault_at_ms else {
            return false;
        };
        let cleared = self
            .config
            .fault_clear_ms
            .map(|clear| self.now_ms >= clear)
            .unwrap_or(false);
        self.now_ms >= start && !cleared
    }
}

impl TemperatureSensor for SimulatedOven {
    fn read_celsius(&mut self) -> Result<f32, SensorFault> {
        if self.fault_active() {
            return Err(SensorFault::Open);
        }
        Ok(self.temp_c)
    }
}

impl HeaterOutput for SimulatedOven {
    fn set_energized(&mut self, energized: bool) {
        if energized != self.heater {
            debug!("ssr {}", if energized { "on" } else { "off" });
        }
        self.heater = energized;
    }
}

impl Buzzer for SimulatedOven {
    fn set_buzzer(&mut self, on: bool) {
        if on && !self.buzzer {
            info!("buzzer: beep");
        }
        self.buzzer = on;
    }
}

impl Indicator for SimulatedOven {
    fn set_indicator(&mut self, on: bool) {
        if on != self.indicator {
            debug!("status led {}", if on { "on" } else { "off" });
        }
        self.indicator = on;
    }
}

impl ButtonInput for SimulatedOven {
    fn is_pressed(&mut self) -> bool {
        if let Some(until) = self.press_until_ms {
            if self.now_ms < until || self.press_samples < MIN_PRESS_SAMPLES {
                self.press_samples += 1;
                return true;
            }
            debug!("button released after {} samples", self.press_samples);
            self.press_until_ms = None;
            self.press_samples = 0;
            return false;
        }

        let queued = self
            .press_requests
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .is_ok();
        if queued {
            self.press_until_ms = Some(self.now_ms + self.config.press_ms);
            self.press_samples = 1;
        }
        queued
    }
}

impl StatusDisplay for SimulatedOven {
    fn show_splash(&mut self) {
        info!("[lcd] Reflow / Oven {}", env!("CARGO_PKG_VERSION"));
    }

    fn show(&mut self, phase_label: &str, reading: &str) {
        let screen = (phase_label.to_string(), reading.to_string());
        if self.last_screen.as_ref().map(|(label, _)| label) != Some(&screen.0) {
            info!("[lcd] {phase_label} | {reading}");
        } else {
            debug!("[lcd] {phase_label} | {reading}");
        }
        self.last_screen = Some(screen);
    }
}

impl Telemetry for SimulatedOven {
    fn record(&mut self, record: &TelemetryRecord) {
        match serde_json::to_string(record) {
            Ok(line) => info!(target: "telemetry", "{line}"),
            Err(err) => warn!("telemetry serialization failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use reflow_common::{OvenConfig, ReflowOven, ReflowPhase};

    use super::*;

    fn oven(config: SimConfig) -> (SimulatedOven, Arc<AtomicUsize>) {
        let presses = Arc::new(AtomicUsize::new(0));
        (SimulatedOven::new(config, presses.clone()), presses)
    }

    #[test]
    fn heats_while_energized_and_cools_toward_ambient() {
        let (mut sim, _) = oven(SimConfig::default());
        sim.set_energized(true);
        for now_ms in (100..=10_000).step_by(100) {
            sim.advance(now_ms);
        }
        let hot = sim.temperature_c();
        assert!(hot > 60.0 && hot < 65.0, "got {hot}");

        sim.set_energized(false);
        sim.advance(20_000);
        assert!(sim.temperature_c() < hot);
        assert!(sim.temperature_c() > 25.0);
    }

    #[test]
    fn fault_window_reports_open_circuit() {
        let (mut sim, _) = oven(SimConfig {
            fault_at_ms: Some(1_000),
            fault_clear_ms: Some(2_000),
            ..SimConfig::default()
        });

        assert_eq!(sim.read_celsius(), Ok(25.0));
        sim.advance(1_000);
        assert_eq!(sim.read_celsius(), Err(SensorFault::Open));
        sim.advance(2_000);
        assert_eq!(sim.read_celsius(), Ok(25.0));
    }

    #[test]
    fn queued_press_holds_button_down_for_press_duration() {
        let (mut sim, presses) = oven(SimConfig::default());
        assert!(!sim.is_pressed());

        presses.fetch_add(1, Ordering::SeqCst);
        assert!(sim.is_pressed());
        assert_eq!(presses.load(Ordering::SeqCst), 0);

        for now_ms in [20, 40, 60, 80, 99] {
            sim.advance(now_ms);
            assert!(sim.is_pressed(), "released early at {now_ms}ms");
        }
        sim.advance(100);
        assert!(!sim.is_pressed());
        assert!(!sim.is_pressed());
    }

    #[test]
    fn coarse_loop_keeps_press_down_for_minimum_samples() {
        let (mut sim, presses) = oven(SimConfig::default());
        presses.fetch_add(1, Ordering::SeqCst);

        assert!(sim.is_pressed());
        sim.advance(500);
        assert!(sim.is_pressed());
        sim.advance(1_000);
        assert!(sim.is_pressed());
        sim.advance(1_500);
        assert!(!sim.is_pressed());
    }

    fn run_oven(tick_times: &[u64], press_at_ms: u64) -> ReflowPhase {
        let (sim, presses) = oven(SimConfig::default());
        let mut reflow = ReflowOven::new(sim, &OvenConfig::default(), 0);
        for &now_ms in tick_times {
            if now_ms == press_at_ms {
                presses.fetch_add(1, Ordering::SeqCst);
            }
            reflow.io_mut().advance(now_ms);
            reflow.poll(now_ms);
        }
        reflow.phase()
    }

    #[test]
    fn queued_press_starts_cycle_with_uneven_loop_timing() {
        // 50 ms loop with one early tick right after the press lands.
        let mut ticks: Vec<u64> = (0..=100).map(|tick| tick * 50).collect();
        ticks[4] = 195;
        assert_eq!(run_oven(&ticks, 150), ReflowPhase::Preheat);
    }

    #[test]
    fn queued_press_starts_cycle_with_100ms_loop() {
        let mut ticks: Vec<u64> = (0..=50).map(|tick| tick * 100).collect();
        ticks[11] = 1_095;
        assert_eq!(run_oven(&ticks, 300), ReflowPhase::Preheat);
        assert_eq!(run_oven(&ticks, 1_095), ReflowPhase::Preheat);
    }
}
