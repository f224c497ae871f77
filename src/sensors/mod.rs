//! Sensor subsystem: individual drivers, simulators and the polling worker.
//!
//! Every reading source is one variant of the closed [`Sensor`] enum.
//! Per-port variants carry their [`PortSetting`]; the water-level variants
//! do not.  The [`worker::SensorWorker`] polls them and emits a
//! [`SensorReading`] per successful read.
//!
//! ```text
//!  ┌──────────────────────┐
//!  │ Sensor               │
//!  │  Moisture(port)      │──┐
//!  │  MoistureSim(port)   │──┤   poll()    ┌──────────────┐
//!  │  WaterLevel          │──┼───────────▶│ SensorReading │
//!  │  WaterLevelSim       │──┘            └──────────────┘
//!  └──────────────────────┘
//! ```

pub mod moisture;
pub mod sim;
pub mod water_level;
pub mod worker;

use core::fmt;
use std::sync::{Arc, Mutex};

use embedded_hal::i2c::{Error as _, I2c};

use crate::config::PortSetting;
use crate::error::SensorError;
use moisture::MoistureSensor;
use sim::{MoistureSim, WaterLevelSim};
use water_level::WaterLevelSensor;

// ───────────────────────────────────────────────────────────────
// Bus capability
// ───────────────────────────────────────────────────────────────

/// The two I2C transactions the sensors need.
///
/// Implemented for every [`embedded_hal::i2c::I2c`] bus so any platform HAL
/// plugs in directly.
pub trait I2cBus {
    /// Write `write`, then read `read.len()` bytes in one transaction.
    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), SensorError>;

    /// Plain read of `read.len()` bytes.
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), SensorError>;
}

impl<T: I2c> I2cBus for T {
    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), SensorError> {
        I2c::write_read(self, address, write, read).map_err(|e| SensorError::Bus(e.kind()))
    }

    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), SensorError> {
        I2c::read(self, address, read).map_err(|e| SensorError::Bus(e.kind()))
    }
}

/// One physical bus shared by every hardware sensor.
pub type SharedBus = Arc<Mutex<dyn I2cBus + Send>>;

/// Wrap a bus so several sensors can take turns on it.
pub fn shared_bus(bus: impl I2cBus + Send + 'static) -> SharedBus {
    Arc::new(Mutex::new(bus))
}

/// Run `f` with exclusive access to the bus.
fn with_bus<R>(
    bus: &SharedBus,
    f: impl FnOnce(&mut (dyn I2cBus + Send)) -> Result<R, SensorError>,
) -> Result<R, SensorError> {
    let mut guard = bus.lock().map_err(|_| SensorError::BusPoisoned)?;
    f(&mut *guard)
}

// ───────────────────────────────────────────────────────────────
// Readings
// ───────────────────────────────────────────────────────────────

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    WaterLevel,
    Moisture,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaterLevel => write!(f, "Water Level"),
            Self::Moisture => write!(f, "Moisture"),
        }
    }
}

/// One successful poll.  Consumed and discarded by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorReading {
    /// Reservoir level metric (0–100 in steps of 5 on hardware).
    WaterLevel(f64),
    /// Soil moisture percentage for one port.
    Moisture { port: PortSetting, value: f64 },
}

impl SensorReading {
    pub fn kind(&self) -> SensorKind {
        match self {
            Self::WaterLevel(_) => SensorKind::WaterLevel,
            Self::Moisture { .. } => SensorKind::Moisture,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Self::WaterLevel(value) | Self::Moisture { value, .. } => *value,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor
// ───────────────────────────────────────────────────────────────

/// Every reading source the worker can poll.
pub enum Sensor {
    Moisture(MoistureSensor),
    MoistureSim(MoistureSim),
    WaterLevel(WaterLevelSensor),
    WaterLevelSim(WaterLevelSim),
}

impl Sensor {
    pub fn kind(&self) -> SensorKind {
        match self {
            Self::Moisture(_) | Self::MoistureSim(_) => SensorKind::Moisture,
            Self::WaterLevel(_) | Self::WaterLevelSim(_) => SensorKind::WaterLevel,
        }
    }

    /// The port this sensor belongs to, for per-port variants.
    pub fn port(&self) -> Option<&PortSetting> {
        match self {
            Self::Moisture(s) => Some(s.port()),
            Self::MoistureSim(s) => Some(s.port()),
            Self::WaterLevel(_) | Self::WaterLevelSim(_) => None,
        }
    }

    /// Read the scalar value.
    pub fn read_value(&self) -> Result<f64, SensorError> {
        match self {
            Self::Moisture(s) => s.read_value(),
            Self::MoistureSim(s) => Ok(s.read_value()),
            Self::WaterLevel(s) => s.read_value(),
            Self::WaterLevelSim(s) => Ok(s.read_value()),
        }
    }

    /// Read and tag the value.
    pub fn poll(&self) -> Result<SensorReading, SensorError> {
        let value = self.read_value()?;
        Ok(match self.port() {
            Some(port) => SensorReading::Moisture {
                port: port.clone(),
                value,
            },
            None => SensorReading::WaterLevel(value),
        })
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port() {
            Some(port) => write!(f, "{} [{}]", self.kind(), port.port),
            None => write!(f, "{}", self.kind()),
        }
    }
}

impl From<MoistureSensor> for Sensor {
    fn from(s: MoistureSensor) -> Self {
        Self::Moisture(s)
    }
}

impl From<MoistureSim> for Sensor {
    fn from(s: MoistureSim) -> Self {
        Self::MoistureSim(s)
    }
}

impl From<WaterLevelSensor> for Sensor {
    fn from(s: WaterLevelSensor) -> Self {
        Self::WaterLevel(s)
    }
}

impl From<WaterLevelSim> for Sensor {
    fn from(s: WaterLevelSim) -> Self {
        Self::WaterLevelSim(s)
    }
}
