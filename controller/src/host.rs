use std::{
    path::PathBuf,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use reflow_common::{OvenConfig, PeriodicTimer, ReflowOven};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::sim::{SimConfig, SimulatedOven};

const STATUS_LOG_INTERVAL_MS: u64 = 10_000;

/// Simulation clock running `scale` times faster than wall time.
struct SimClock {
    start: Instant,
    scale: f64,
}

impl SimClock {
    fn new(scale: f64) -> Self {
        Self {
            start: Instant::now(),
            scale,
        }
    }

    fn now_ms(&self) -> u64 {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0 * self.scale;
        elapsed_ms as u64
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config().await?;
    config
        .validate()
        .context("invalid reflow oven configuration")?;

    let sim_config = sim_config_from_env();
    let time_scale = env_parse::<f64>("SIM_TIME_SCALE")
        .filter(|scale| scale.is_finite() && *scale > 0.0)
        .unwrap_or(10.0);
    let tick_ms = env_parse::<u64>("SIM_TICK_MS")
        .filter(|ms| *ms > 0)
        .unwrap_or(5);

    let presses = Arc::new(AtomicUsize::new(0));
    if env_flag("SIM_AUTOSTART") {
        presses.fetch_add(1, Ordering::AcqRel);
    }
    spawn_button_reader(presses.clone());

    let clock = SimClock::new(time_scale);
    let board = SimulatedOven::new(sim_config, presses);
    let mut oven = ReflowOven::new(board, &config, clock.now_ms());
    let mut status_timer = PeriodicTimer::new(0, STATUS_LOG_INTERVAL_MS);

    info!(
        "reflow oven simulation started (x{time_scale} time, {tick_ms}ms loop); press Enter to start or cancel"
    );

    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now_ms = clock.now_ms();
                oven.io_mut().advance(now_ms);
                oven.poll(now_ms);

                if status_timer.fire(now_ms) {
                    match serde_json::to_string(&oven.snapshot(now_ms)) {
                        Ok(body) => debug!("oven state: {body}"),
                        Err(err) => warn!("oven state serialization failed: {err}"),
                    }
                }
            }
            result = &mut shutdown => {
                result.context("failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    oven.shutdown();
    info!(
        "stopped in {} at {:.1}C, heater {}",
        oven.phase().as_str(),
        oven.io().temperature_c(),
        if oven.io().heater_on() { "on" } else { "off" }
    );
    Ok(())
}

async fn load_config() -> anyhow::Result<OvenConfig> {
    let Some(path) = std::env::var_os("REFLOW_CONFIG").map(PathBuf::from) else {
        return Ok(OvenConfig::default());
    };

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read oven config {}", path.display()))?;
    let config = OvenConfig::from_json(&raw)
        .with_context(|| format!("failed to parse oven config {}", path.display()))?;
    info!("loaded oven config from {}", path.display());
    Ok(config)
}

fn sim_config_from_env() -> SimConfig {
    let defaults = SimConfig::default();
    SimConfig {
        ambient_c: env_parse("SIM_AMBIENT_C").unwrap_or(defaults.ambient_c),
        fault_at_ms: env_parse("SIM_FAULT_AT_MS"),
        fault_clear_ms: env_parse("SIM_FAULT_CLEAR_MS"),
        ..defaults
    }
}

/// Every line on stdin is one button press.
fn spawn_button_reader(presses: Arc<AtomicUsize>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    presses.fetch_add(1, Ordering::AcqRel);
                    info!("button press queued");
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("stdin read error: {err}");
                    break;
                }
            }
        }
    });
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
