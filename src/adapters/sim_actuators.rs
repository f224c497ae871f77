//! In-memory relay outputs for simulation runs.
//!
//! Records the last level driven on each GPIO.  Clones share the same
//! table, so the binary can keep one to inspect what the controller did.
//! Header mapping is enforced exactly like on hardware.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::app::ports::{ActuatorPort, OutputLevel};
use crate::error::ActuatorError;
use crate::pins;

#[derive(Debug, Clone, Default)]
pub struct SimActuators {
    levels: Arc<Mutex<BTreeMap<i32, OutputLevel>>>,
}

impl SimActuators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level driven on `gpio`, if it was ever driven.
    pub fn level(&self, gpio: i32) -> Option<OutputLevel> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&gpio)
            .copied()
    }

    pub fn is_energized(&self, gpio: i32) -> bool {
        self.level(gpio) == Some(OutputLevel::Energized)
    }
}

impl ActuatorPort for SimActuators {
    fn set_output(&mut self, gpio: i32, level: OutputLevel) -> Result<(), ActuatorError> {
        let header = pins::require_header_pin(gpio)?;
        let previous = self
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(gpio, level);
        if previous != Some(level) {
            debug!("[sim] GPIO{} (pin {}) -> {:?}", gpio, header, level);
        }
        Ok(())
    }
}
