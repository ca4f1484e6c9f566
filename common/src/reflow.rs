use log::{info, warn};

use crate::{
    config::ReflowProfile,
    types::{ButtonEvent, OvenSnapshot, OvenStatus, PhaseContext, ReflowPhase, TemperatureSample},
};

/// Ramp limiter shared by Preheat and Reflow: heat only while the rise since
/// the phase started stays below `elapsed seconds * ramp rate`.
///
/// There is no hysteresis band, so near the boundary the result can flip on
/// every evaluation.
pub fn ramp_allows_heat(
    temp_c: f32,
    context: &PhaseContext,
    now_ms: u64,
    rate_c_per_s: f32,
) -> bool {
    let risen_c = temp_c - context.start_temp_c;
    let elapsed_s = context.elapsed_ms(now_ms) as f32 / 1000.0;
    risen_c < elapsed_s * rate_c_per_s
}

#[derive(Debug, Clone)]
pub struct ReflowEngine {
    pub profile: ReflowProfile,
    buzzer_ms: u64,

    phase: ReflowPhase,
    context: Option<PhaseContext>,

    sample: Option<TemperatureSample>,
    last_temp_c: f32,

    heater_on: bool,
    buzzer_on: bool,
    buzzer_deadline_ms: Option<u64>,
}

impl ReflowEngine {
    pub fn new(profile: ReflowProfile, buzzer_ms: u64) -> Self {
        Self {
            profile,
            buzzer_ms,
            phase: ReflowPhase::Idle,
            context: None,
            sample: None,
            last_temp_c: 0.0,
            heater_on: false,
            buzzer_on: false,
            buzzer_deadline_ms: None,
        }
    }

    pub fn phase(&self) -> ReflowPhase {
        self.phase
    }

    pub fn status(&self) -> OvenStatus {
        self.phase.oven_status()
    }

    pub fn context(&self) -> Option<PhaseContext> {
        self.context
    }

    pub fn sample(&self) -> Option<TemperatureSample> {
        self.sample
    }

    /// Latest valid reading, if the most recent sample was not a fault.
    pub fn temperature_c(&self) -> Option<f32> {
        self.sample.and_then(TemperatureSample::celsius)
    }

    pub fn heater_on(&self) -> bool {
        self.heater_on
    }

    pub fn buzzer_on(&self) -> bool {
        self.buzzer_on
    }

    pub fn buzzer_deadline_ms(&self) -> Option<u64> {
        self.buzzer_deadline_ms
    }

    pub fn phase_elapsed_ms(&self, now_ms: u64) -> u64 {
        self.context
            .map(|context| context.elapsed_ms(now_ms))
            .unwrap_or(0)
    }

    /// Stores a fresh sensor reading. A fault overrides the profile table and
    /// drops the oven into `Error` with the heater off.
    pub fn record_sample(&mut self, sample: TemperatureSample, now_ms: u64) {
        self.sample = Some(sample);
        match sample {
            TemperatureSample::Celsius(temp_c) => self.last_temp_c = temp_c,
            TemperatureSample::Fault(fault) => {
                self.heater_on = false;
                if self.phase != ReflowPhase::Error {
                    warn!("sensor fault in {}: {fault}", self.phase.as_str());
                    self.enter_phase(ReflowPhase::Error, now_ms);
                }
            }
        }
    }

    /// Runs one row of the profile table. A press is taken out of `button`
    /// only when it starts a cycle from `Idle`.
    pub fn step(&mut self, now_ms: u64, button: &mut ButtonEvent) {
        let temp_c = match self.sample {
            None => {
                self.heater_on = false;
                return;
            }
            Some(TemperatureSample::Fault(_)) => {
                self.heater_on = false;
                if self.phase != ReflowPhase::Error {
                    self.enter_phase(ReflowPhase::Error, now_ms);
                }
                return;
            }
            Some(TemperatureSample::Celsius(temp_c)) => temp_c,
        };

        match self.phase {
            ReflowPhase::Idle => {
                self.heater_on = false;
                if temp_c >= self.profile.room_temp_c {
                    self.enter_phase(ReflowPhase::TooHot, now_ms);
                } else if button.take().is_pressed() {
                    info!("reflow cycle started at {temp_c:.2}C");
                    self.enter_phase(ReflowPhase::Preheat, now_ms);
                }
            }
            ReflowPhase::Preheat => {
                self.heater_on = self.ramp_allows_heat(temp_c, now_ms);
                if temp_c >= self.profile.soak_temp_c {
                    self.enter_phase(ReflowPhase::Soak, now_ms);
                }
            }
            ReflowPhase::Soak => {
                self.heater_on = temp_c < self.profile.soak_temp_c;
                if now_ms > self.phase_start_ms(now_ms) + self.profile.soak_period_ms {
                    self.enter_phase(ReflowPhase::Reflow, now_ms);
                }
            }
            ReflowPhase::Reflow => {
                self.heater_on = self.ramp_allows_heat(temp_c, now_ms);
                if temp_c >= self.profile.peak_temp_c {
                    self.enter_phase(ReflowPhase::Peak, now_ms);
                }
            }
            ReflowPhase::Peak => {
                self.heater_on = temp_c < self.profile.peak_temp_c;
                if now_ms > self.phase_start_ms(now_ms) + self.profile.peak_period_ms {
                    self.heater_on = false;
                    self.enter_phase(ReflowPhase::Cool, now_ms);
                }
            }
            ReflowPhase::Cool => {
                self.heater_on = false;
                if temp_c <= self.profile.cool_temp_c {
                    self.enter_phase(ReflowPhase::Complete, now_ms);
                    self.buzzer_on = true;
                    self.buzzer_deadline_ms = Some(now_ms + self.buzzer_ms);
                }
            }
            ReflowPhase::Complete => {
                self.heater_on = false;
                let expired = self
                    .buzzer_deadline_ms
                    .map(|deadline| now_ms > deadline)
                    .unwrap_or(true);
                if expired {
                    info!("reflow cycle complete");
                    self.enter_phase(ReflowPhase::Idle, now_ms);
                }
            }
            ReflowPhase::TooHot => {
                self.heater_on = false;
                if temp_c < self.profile.room_temp_c {
                    self.enter_phase(ReflowPhase::Idle, now_ms);
                }
            }
            ReflowPhase::Error => {
                self.heater_on = false;
                info!("sensor reading restored at {temp_c:.2}C");
                self.enter_phase(ReflowPhase::Idle, now_ms);
            }
        }
    }

    /// Operator abort: a press while the oven is on returns it to `Idle`.
    pub fn cancel_if_running(&mut self, button: ButtonEvent, now_ms: u64) -> bool {
        if !button.is_pressed() || !self.status().is_on() {
            return false;
        }

        info!("reflow cycle cancelled during {}", self.phase.as_str());
        self.heater_on = false;
        self.enter_phase(ReflowPhase::Idle, now_ms);
        true
    }

    /// Clears any heater demand while the oven is off.
    pub fn enforce_safety(&mut self) {
        if !self.status().is_on() {
            self.heater_on = false;
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> OvenSnapshot {
        OvenSnapshot {
            phase: self.phase.as_str(),
            label: self.phase.label(),
            status: self.status().as_str(),
            temperature_c: self.temperature_c(),
            fault: self
                .sample
                .and_then(TemperatureSample::fault)
                .map(|fault| fault.as_str()),
            heater: self.heater_on,
            buzzer: self.buzzer_on,
            phase_elapsed_ms: self.phase_elapsed_ms(now_ms),
        }
    }

    fn ramp_allows_heat(&self, temp_c: f32, now_ms: u64) -> bool {
        let context = self.context.unwrap_or(PhaseContext {
            start_ms: now_ms,
            start_temp_c: temp_c,
        });
        ramp_allows_heat(temp_c, &context, now_ms, self.profile.ramp_rate_c_per_s)
    }

    fn phase_start_ms(&self, now_ms: u64) -> u64 {
        self.context
            .map(|context| context.start_ms)
            .unwrap_or(now_ms)
    }

    fn enter_phase(&mut self, next: ReflowPhase, now_ms: u64) {
        info!("phase {} -> {}", self.phase.as_str(), next.as_str());
        self.context = Some(PhaseContext {
            start_ms: now_ms,
            start_temp_c: self.last_temp_c,
        });
        if next != ReflowPhase::Complete {
            self.buzzer_on = false;
            self.buzzer_deadline_ms = None;
        }
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::SensorFault;

    fn engine() -> ReflowEngine {
        ReflowEngine::new(ReflowProfile::default(), 1_000)
    }

    fn engine_in(phase: ReflowPhase, start_ms: u64, start_temp_c: f32) -> ReflowEngine {
        let mut engine = engine();
        engine.phase = phase;
        engine.context = Some(PhaseContext {
            start_ms,
            start_temp_c,
        });
        engine.last_temp_c = start_temp_c;
        engine
    }

    fn step_at(engine: &mut ReflowEngine, temp_c: f32, now_ms: u64) {
        engine.record_sample(TemperatureSample::Celsius(temp_c), now_ms);
        engine.step(now_ms, &mut ButtonEvent::None);
    }

    #[test]
    fn press_in_idle_starts_preheat_and_captures_context() {
        let mut engine = engine();
        engine.record_sample(TemperatureSample::Celsius(25.0), 1_000);

        let mut button = ButtonEvent::Pressed;
        engine.step(1_000, &mut button);

        assert_eq!(engine.phase(), ReflowPhase::Preheat);
        assert_eq!(engine.status(), OvenStatus::On);
        assert_eq!(
            engine.context(),
            Some(PhaseContext {
                start_ms: 1_000,
                start_temp_c: 25.0
            })
        );
        assert_eq!(button, ButtonEvent::None);
    }

    #[test]
    fn idle_without_press_stays_idle() {
        let mut engine = engine();
        step_at(&mut engine, 25.0, 500);
        assert_eq!(engine.phase(), ReflowPhase::Idle);
        assert!(!engine.heater_on());
    }

    #[test]
    fn hot_oven_refuses_to_start_until_cooled() {
        let mut engine = engine();
        engine.record_sample(TemperatureSample::Celsius(50.0), 0);
        let mut button = ButtonEvent::Pressed;
        engine.step(0, &mut button);

        assert_eq!(engine.phase(), ReflowPhase::TooHot);
        assert_eq!(button, ButtonEvent::Pressed);

        step_at(&mut engine, 50.0, 200);
        assert_eq!(engine.phase(), ReflowPhase::TooHot);

        step_at(&mut engine, 49.5, 400);
        assert_eq!(engine.phase(), ReflowPhase::Idle);
    }

    #[test]
    fn ramp_rule_is_strict_at_boundary() {
        let context = PhaseContext {
            start_ms: 1_000,
            start_temp_c: 25.0,
        };

        // Exactly 3 °C/s over 2 s.
        assert!(!ramp_allows_heat(31.0, &context, 3_000, 3.0));
        assert!(ramp_allows_heat(30.5, &context, 3_000, 3.0));
        assert!(!ramp_allows_heat(25.0, &context, 1_000, 3.0));
    }

    #[test]
    fn preheat_follows_ramp_limit() {
        let mut engine = engine_in(ReflowPhase::Preheat, 1_000, 25.0);

        step_at(&mut engine, 31.0, 3_000);
        assert!(!engine.heater_on());

        step_at(&mut engine, 30.5, 3_000);
        assert!(engine.heater_on());
        assert_eq!(engine.phase(), ReflowPhase::Preheat);
    }

    #[test]
    fn preheat_enters_soak_on_first_tick_at_soak_temp() {
        let mut engine = engine_in(ReflowPhase::Preheat, 0, 25.0);

        step_at(&mut engine, 149.9, 30_000);
        assert_eq!(engine.phase(), ReflowPhase::Preheat);

        // Rise far above the ramp limit, heater rule says off; transition still fires.
        step_at(&mut engine, 150.0, 40_000);
        assert_eq!(engine.phase(), ReflowPhase::Soak);
        assert_eq!(
            engine.context(),
            Some(PhaseContext {
                start_ms: 40_000,
                start_temp_c: 150.0
            })
        );
    }

    #[test]
    fn soak_runs_for_full_period() {
        let mut engine = engine_in(ReflowPhase::Soak, 10_000, 150.0);

        step_at(&mut engine, 148.0, 20_000);
        assert!(engine.heater_on());
        step_at(&mut engine, 151.0, 30_000);
        assert!(!engine.heater_on());

        step_at(&mut engine, 149.0, 100_000);
        assert_eq!(engine.phase(), ReflowPhase::Soak);
        assert!(engine.heater_on());

        step_at(&mut engine, 149.0, 100_001);
        assert_eq!(engine.phase(), ReflowPhase::Reflow);
    }

    #[test]
    fn reflow_ramps_then_enters_peak() {
        let mut engine = engine_in(ReflowPhase::Reflow, 0, 150.0);

        step_at(&mut engine, 152.0, 1_000);
        assert!(engine.heater_on());
        step_at(&mut engine, 160.0, 2_000);
        assert!(!engine.heater_on());

        step_at(&mut engine, 237.0, 40_000);
        assert_eq!(engine.phase(), ReflowPhase::Peak);
    }

    #[test]
    fn peak_timeout_forces_heater_off() {
        let mut engine = engine_in(ReflowPhase::Peak, 0, 237.0);

        step_at(&mut engine, 230.0, 50_000);
        assert_eq!(engine.phase(), ReflowPhase::Peak);
        assert!(engine.heater_on());

        step_at(&mut engine, 230.0, 50_001);
        assert_eq!(engine.phase(), ReflowPhase::Cool);
        assert!(!engine.heater_on());
        assert_eq!(engine.status(), OvenStatus::Off);
    }

    #[test]
    fn complete_sounds_buzzer_for_one_second() {
        let mut engine = engine_in(ReflowPhase::Cool, 0, 237.0);

        step_at(&mut engine, 100.5, 4_000);
        assert_eq!(engine.phase(), ReflowPhase::Cool);

        step_at(&mut engine, 100.0, 5_000);
        assert_eq!(engine.phase(), ReflowPhase::Complete);
        assert!(engine.buzzer_on());
        assert_eq!(engine.buzzer_deadline_ms(), Some(6_000));

        step_at(&mut engine, 90.0, 6_000);
        assert_eq!(engine.phase(), ReflowPhase::Complete);
        assert!(engine.buzzer_on());

        step_at(&mut engine, 90.0, 6_001);
        assert_eq!(engine.phase(), ReflowPhase::Idle);
        assert!(!engine.buzzer_on());
        assert_eq!(engine.buzzer_deadline_ms(), None);
    }

    #[test]
    fn fault_forces_error_from_every_phase() {
        let phases = [
            ReflowPhase::Idle,
            ReflowPhase::Preheat,
            ReflowPhase::Soak,
            ReflowPhase::Reflow,
            ReflowPhase::Peak,
            ReflowPhase::Cool,
            ReflowPhase::Complete,
            ReflowPhase::TooHot,
        ];

        for phase in phases {
            let mut engine = engine_in(phase, 0, 120.0);
            engine.heater_on = true;

            engine.record_sample(TemperatureSample::Fault(SensorFault::Open), 1_000);

            assert_eq!(engine.phase(), ReflowPhase::Error, "from {phase:?}");
            assert!(!engine.heater_on(), "from {phase:?}");
            assert!(!engine.buzzer_on(), "from {phase:?}");
        }
    }

    #[test]
    fn error_holds_while_fault_persists_and_recovers_after_one_good_read() {
        let mut engine = engine_in(ReflowPhase::Soak, 0, 150.0);
        engine.record_sample(TemperatureSample::Fault(SensorFault::ShortToGround), 200);
        engine.step(200, &mut ButtonEvent::None);
        assert_eq!(engine.phase(), ReflowPhase::Error);

        engine.record_sample(TemperatureSample::Fault(SensorFault::ShortToSupply), 400);
        engine.step(400, &mut ButtonEvent::None);
        assert_eq!(engine.phase(), ReflowPhase::Error);
        assert_eq!(engine.snapshot(400).fault, Some("SHORT_VCC"));

        step_at(&mut engine, 30.0, 600);
        assert_eq!(engine.phase(), ReflowPhase::Idle);
    }

    #[test]
    fn press_cancels_every_heating_phase() {
        for phase in [
            ReflowPhase::Preheat,
            ReflowPhase::Soak,
            ReflowPhase::Reflow,
            ReflowPhase::Peak,
        ] {
            let mut engine = engine_in(phase, 0, 120.0);
            engine.heater_on = true;

            assert!(engine.cancel_if_running(ButtonEvent::Pressed, 5_000));
            assert_eq!(engine.phase(), ReflowPhase::Idle, "from {phase:?}");
            assert!(!engine.heater_on(), "from {phase:?}");
        }
    }

    #[test]
    fn press_is_ignored_while_oven_is_off() {
        for phase in [
            ReflowPhase::Idle,
            ReflowPhase::Cool,
            ReflowPhase::Complete,
            ReflowPhase::TooHot,
            ReflowPhase::Error,
        ] {
            let mut engine = engine_in(phase, 0, 120.0);
            assert!(!engine.cancel_if_running(ButtonEvent::Pressed, 5_000));
            assert_eq!(engine.phase(), phase);
        }
    }

    #[test]
    fn no_sample_keeps_heater_off() {
        let mut engine = engine();
        let mut button = ButtonEvent::Pressed;
        engine.step(0, &mut button);

        assert_eq!(engine.phase(), ReflowPhase::Idle);
        assert!(!engine.heater_on());
        assert_eq!(button, ButtonEvent::Pressed);
    }

    #[test]
    fn safety_clears_heater_demand_when_off() {
        let mut engine = engine_in(ReflowPhase::Cool, 0, 200.0);
        engine.heater_on = true;
        engine.enforce_safety();
        assert!(!engine.heater_on());

        let mut engine = engine_in(ReflowPhase::Soak, 0, 140.0);
        engine.heater_on = true;
        engine.enforce_safety();
        assert!(engine.heater_on());
    }

    #[test]
    fn snapshot_reports_phase_and_reading() {
        let mut engine = engine_in(ReflowPhase::Soak, 1_000, 150.0);
        step_at(&mut engine, 148.5, 3_500);

        assert_eq!(
            engine.snapshot(3_500),
            OvenSnapshot {
                phase: "SOAK",
                label: "Soak",
                status: "ON",
                temperature_c: Some(148.5),
                fault: None,
                heater: true,
                buzzer: false,
                phase_elapsed_ms: 2_500,
            }
        );
    }
}
