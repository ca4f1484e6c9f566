//! Cooperative control loop.
//!
//! One call to [`ReflowOven::poll`] is one loop iteration:
//!
//! 1. fire due timers (sensor read, display/telemetry refresh)
//! 2. step the reflow phase machine
//! 3. apply the cancel rule to any pending press
//! 4. step the button debouncer
//! 5. force the heater off whenever the oven status is off, then drive outputs
//!
//! Nothing here blocks; all timing is a comparison against `now_ms`.

use log::debug;

use crate::{
    config::OvenConfig,
    debounce::Debouncer,
    ports::OvenIo,
    reflow::ReflowEngine,
    timer::PeriodicTimer,
    types::{ButtonEvent, OvenSnapshot, ReflowPhase, TelemetryRecord, TemperatureSample},
};

pub struct ReflowOven<IO> {
    io: IO,
    engine: ReflowEngine,
    debouncer: Debouncer,
    button: ButtonEvent,

    sensor_timer: PeriodicTimer,
    display_timer: PeriodicTimer,

    cycle_seconds: u32,
    indicator_on: bool,
    buzzer_on: bool,
}

impl<IO: OvenIo> ReflowOven<IO> {
    /// Shows the splash screen and parks every output in its safe state.
    pub fn new(mut io: IO, config: &OvenConfig, now_ms: u64) -> Self {
        io.set_energized(false);
        io.set_buzzer(false);
        io.set_indicator(false);
        io.show_splash();

        Self {
            io,
            engine: ReflowEngine::new(config.profile.clone(), config.timing.buzzer_ms),
            debouncer: Debouncer::new(config.timing.debounce_ms),
            button: ButtonEvent::None,
            sensor_timer: PeriodicTimer::new(now_ms, config.timing.sensor_interval_ms),
            display_timer: PeriodicTimer::new(
                now_ms + config.timing.splash_ms,
                config.timing.display_interval_ms,
            ),
            cycle_seconds: 0,
            indicator_on: false,
            buzzer_on: false,
        }
    }

    pub fn poll(&mut self, now_ms: u64) {
        if self.sensor_timer.fire(now_ms) {
            let sample = TemperatureSample::from(self.io.read_celsius());
            self.engine.record_sample(sample, now_ms);
        }

        if self.display_timer.fire(now_ms) {
            self.refresh_display();
        }

        let previous = self.engine.phase();
        self.engine.step(now_ms, &mut self.button);
        if previous == ReflowPhase::Idle && self.engine.phase() == ReflowPhase::Preheat {
            self.cycle_seconds = 0;
        }

        self.engine.cancel_if_running(self.button.take(), now_ms);

        let pressed = self.io.is_pressed();
        self.debouncer.poll(pressed, now_ms, &mut self.button);

        self.engine.enforce_safety();
        self.drive_outputs();
    }

    /// De-energizes every output. Used when the host loop stops.
    pub fn shutdown(&mut self) {
        self.io.set_energized(false);
        self.io.set_buzzer(false);
        self.io.set_indicator(false);
        self.buzzer_on = false;
        self.indicator_on = false;
    }

    pub fn engine(&self) -> &ReflowEngine {
        &self.engine
    }

    pub fn phase(&self) -> ReflowPhase {
        self.engine.phase()
    }

    pub fn cycle_seconds(&self) -> u32 {
        self.cycle_seconds
    }

    pub fn snapshot(&self, now_ms: u64) -> OvenSnapshot {
        self.engine.snapshot(now_ms)
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    fn refresh_display(&mut self) {
        let phase = self.engine.phase();

        if self.engine.status().is_on() {
            self.cycle_seconds = self.cycle_seconds.saturating_add(1);
            self.indicator_on = !self.indicator_on;
            if let Some(temperature_c) = self.engine.temperature_c() {
                self.io.record(&TelemetryRecord {
                    elapsed_s: self.cycle_seconds,
                    temperature_c,
                    phase: phase.as_str(),
                    heater: self.engine.heater_on(),
                });
            }
        } else {
            self.indicator_on = false;
        }
        self.io.set_indicator(self.indicator_on);

        let reading = self
            .engine
            .sample()
            .map(TemperatureSample::display_text)
            .unwrap_or_else(|| "--".to_string());
        debug!("display: {} / {}", phase.label(), reading);
        self.io.show(phase.label(), &reading);
    }

    fn drive_outputs(&mut self) {
        let energize = self.engine.heater_on() && self.engine.status().is_on();
        self.io.set_energized(energize);

        let buzzer = self.engine.buzzer_on();
        if buzzer != self.buzzer_on {
            self.io.set_buzzer(buzzer);
            self.buzzer_on = buzzer;
        }
    }
}
