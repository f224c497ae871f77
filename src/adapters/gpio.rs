//! Relay outputs on real GPIO lines.
//!
//! Wraps any [`embedded_hal::digital::OutputPin`] so a platform HAL's pin
//! type plugs straight into the controller.  Pins are registered by their
//! BCM number and must have a header mapping.

use std::collections::BTreeMap;

use embedded_hal::digital::OutputPin;
use log::debug;

use crate::app::ports::{ActuatorPort, OutputLevel};
use crate::error::ActuatorError;
use crate::pins;

/// Concrete adapter that exposes a set of output pins through [`ActuatorPort`].
pub struct GpioActuators<P> {
    pins: BTreeMap<i32, P>,
}

impl<P: OutputPin> GpioActuators<P> {
    pub fn new() -> Self {
        Self {
            pins: BTreeMap::new(),
        }
    }

    /// Register `pin` as BCM `gpio`.
    pub fn with_pin(mut self, gpio: i32, pin: P) -> Result<Self, ActuatorError> {
        pins::require_header_pin(gpio)?;
        self.pins.insert(gpio, pin);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

impl<P: OutputPin> Default for GpioActuators<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> ActuatorPort for GpioActuators<P> {
    fn set_output(&mut self, gpio: i32, level: OutputLevel) -> Result<(), ActuatorError> {
        let header = pins::require_header_pin(gpio)?;
        let pin = self
            .pins
            .get_mut(&gpio)
            .ok_or(ActuatorError::NotConfigured(gpio))?;

        let written = if level.is_high() {
            pin.set_high()
        } else {
            pin.set_low()
        };
        written.map_err(|_| ActuatorError::WriteFailed(gpio))?;

        debug!(
            "GPIO{} (pin {}) -> {}",
            gpio,
            header,
            if level.is_high() { "HIGH" } else { "LOW" }
        );
        Ok(())
    }
}
