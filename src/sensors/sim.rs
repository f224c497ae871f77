//! In-memory sensors for running without hardware.
//!
//! A simulator owns a shared value cell; the matching handle sets it from
//! any thread while the worker keeps polling the simulator.  Both start at
//! [`DEFAULT_SIM_VALUE`] (wet soil, full reservoir) unless told otherwise.

use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::PortSetting;

/// Initial value of every simulator.
pub const DEFAULT_SIM_VALUE: f64 = 100.0;

/// Largest change applied per ramp step.
pub const RAMP_STEP: f64 = 1.0;

const RAMP_PAUSE_MIN_MS: u64 = 100;
const RAMP_PAUSE_MAX_MS: u64 = 300;

/// `f64` stored as bits so readers never block.
#[derive(Debug, Clone)]
struct SimValue(Arc<AtomicU64>);

impl SimValue {
    fn new(value: f64) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

// ───────────────────────────────────────────────────────────────
// Moisture
// ───────────────────────────────────────────────────────────────

pub struct MoistureSim {
    setting: PortSetting,
    value: SimValue,
}

impl MoistureSim {
    pub fn new(setting: PortSetting) -> Self {
        Self {
            setting,
            value: SimValue::new(DEFAULT_SIM_VALUE),
        }
    }

    pub fn port(&self) -> &PortSetting {
        &self.setting
    }

    pub fn read_value(&self) -> f64 {
        self.value.get()
    }

    pub fn handle(&self) -> MoistureSimHandle {
        MoistureSimHandle {
            port: self.setting.port.clone(),
            value: self.value.clone(),
        }
    }
}

/// Setter for one port's simulated moisture.
#[derive(Debug, Clone)]
pub struct MoistureSimHandle {
    port: String,
    value: SimValue,
}

impl MoistureSimHandle {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn set(&self, value: f64) {
        debug!("Simulated moisture [{}] = {}", self.port, value);
        self.value.set(value);
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }
}

// ───────────────────────────────────────────────────────────────
// Water level
// ───────────────────────────────────────────────────────────────

pub struct WaterLevelSim {
    value: SimValue,
}

impl WaterLevelSim {
    pub fn new(initial: f64) -> Self {
        Self {
            value: SimValue::new(initial),
        }
    }

    pub fn read_value(&self) -> f64 {
        self.value.get()
    }

    pub fn handle(&self) -> WaterLevelSimHandle {
        WaterLevelSimHandle {
            value: self.value.clone(),
        }
    }
}

impl Default for WaterLevelSim {
    fn default() -> Self {
        Self::new(DEFAULT_SIM_VALUE)
    }
}

/// Setter for the simulated reservoir level.
#[derive(Debug, Clone)]
pub struct WaterLevelSimHandle {
    value: SimValue,
}

impl WaterLevelSimHandle {
    pub fn set(&self, value: f64) {
        self.value.set(value);
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Walk the level to `target` in steps of at most [`RAMP_STEP`],
    /// sleeping for `pause()` after each step.  Blocks the caller until the
    /// target is reached and returns the number of steps taken.
    pub fn ramp_to(&self, target: f64, mut pause: impl FnMut() -> Duration) -> usize {
        if !target.is_finite() {
            warn!("Ignoring non-finite water level target {}", target);
            return 0;
        }

        let mut current = self.value();
        let mut steps = 0;
        while (target - current).abs() > f64::EPSILON {
            current += (target - current).clamp(-RAMP_STEP, RAMP_STEP);
            self.set(current);
            steps += 1;
            std::thread::sleep(pause());
        }
        debug!("Simulated water level reached {} in {} steps", target, steps);
        steps
    }
}

/// Random pause between ramp steps, 100–300 ms.
pub fn ramp_pause() -> Duration {
    let entropy = RandomState::new().build_hasher().finish();
    let span = RAMP_PAUSE_MAX_MS - RAMP_PAUSE_MIN_MS + 1;
    Duration::from_millis(RAMP_PAUSE_MIN_MS + entropy % span)
}
