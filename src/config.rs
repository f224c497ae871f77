//! Station configuration parameters
//!
//! [`StationSettings`] describes the physical installation: which I2C bus
//! and addresses the sensors live on, which GPIO drives the shared pump, and
//! the ordered list of irrigation ports.  It is loaded once at startup by a
//! [`SettingsSource`](crate::app::ports::SettingsSource) and is read-only for
//! the lifetime of the process.
//!
//! [`RuntimeConfig`] holds process options that are never persisted.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Maximum number of ports; the moisture ADC exposes eight channels.
pub const MAX_PORTS: usize = 8;

/// Number of channels on the moisture ADC.
pub const MOISTURE_CHANNELS: u8 = 8;

/// Highest valid 7-bit I2C address.
const MAX_I2C_ADDRESS: u8 = 0x7F;

/// One irrigation channel: a moisture sensor channel paired with a valve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSetting {
    /// Port label, unique within a station (e.g. `"A"`).
    pub port: String,
    /// Channel on the moisture ADC.
    #[serde(rename = "moistureChannel")]
    pub moisture_channel: u8,
    /// BCM GPIO driving this port's valve.
    #[serde(rename = "valveGPIO")]
    pub valve_gpio: i32,
}

/// Process-wide station configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSettings {
    // --- Bus ---
    /// I2C bus identifier (e.g. `"1"` for `/dev/i2c-1`).
    #[serde(rename = "groveBus")]
    pub bus: String,

    // --- Sensor addresses ---
    /// Upper water-level sensor array (12 sections).
    #[serde(rename = "waterLevelHighAddress")]
    pub water_level_high_address: u8,
    /// Lower water-level sensor array (8 sections).
    #[serde(rename = "waterLevelLowAddress")]
    pub water_level_low_address: u8,
    /// Moisture ADC.
    #[serde(rename = "moistureAddress")]
    pub moisture_address: u8,

    // --- Actuators ---
    /// BCM GPIO driving the shared pump relay.
    #[serde(rename = "pumpGPIO")]
    pub pump_gpio: i32,

    /// Irrigation ports, in display order.
    pub ports: heapless::Vec<PortSetting, MAX_PORTS>,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            bus: "1".into(),
            water_level_high_address: 0x78,
            water_level_low_address: 0x77,
            moisture_address: 0x08,
            pump_gpio: pins::DEFAULT_PUMP_GPIO,
            ports: [
                PortSetting {
                    port: "A".into(),
                    moisture_channel: 0,
                    valve_gpio: pins::DEFAULT_VALVE_A_GPIO,
                },
                PortSetting {
                    port: "B".into(),
                    moisture_channel: 2,
                    valve_gpio: pins::DEFAULT_VALVE_B_GPIO,
                },
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl StationSettings {
    /// Parse settings from JSON.  Does not validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)
    }

    /// Serialise settings to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|_| ConfigError::Corrupted)
    }

    /// Reject settings the controller cannot run with.
    ///
    /// Without valid settings there is no safe actuator mapping, so callers
    /// must treat any error here as fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("groveBus: must not be empty"));
        }
        for address in [
            self.water_level_high_address,
            self.water_level_low_address,
            self.moisture_address,
        ] {
            if address > MAX_I2C_ADDRESS {
                return Err(ConfigError::ValidationFailed(
                    "sensor address: must be a 7-bit I2C address",
                ));
            }
        }
        if self.ports.is_empty() {
            return Err(ConfigError::ValidationFailed("ports: at least one port required"));
        }
        if pins::header_pin(self.pump_gpio).is_none() {
            return Err(ConfigError::ValidationFailed("pumpGPIO: no header mapping"));
        }

        for (i, p) in self.ports.iter().enumerate() {
            if p.port.trim().is_empty() {
                return Err(ConfigError::ValidationFailed("port: label must not be empty"));
            }
            if p.moisture_channel >= MOISTURE_CHANNELS {
                return Err(ConfigError::ValidationFailed("moistureChannel: must be 0..=7"));
            }
            if pins::header_pin(p.valve_gpio).is_none() {
                return Err(ConfigError::ValidationFailed("valveGPIO: no header mapping"));
            }
            if p.valve_gpio == self.pump_gpio {
                return Err(ConfigError::ValidationFailed("valveGPIO: shared with pumpGPIO"));
            }
            for other in &self.ports[i + 1..] {
                if other.port == p.port {
                    return Err(ConfigError::ValidationFailed("port: labels must be unique"));
                }
                if other.valve_gpio == p.valve_gpio {
                    return Err(ConfigError::ValidationFailed("valveGPIO: shared between ports"));
                }
            }
        }
        Ok(())
    }

    /// Port labels in configured order.
    pub fn port_labels(&self) -> Vec<String> {
        self.ports.iter().map(|p| p.port.clone()).collect()
    }

    /// Look up a port by label.
    pub fn port(&self, label: &str) -> Option<&PortSetting> {
        self.ports.iter().find(|p| p.port == label)
    }
}

/// Process options supplied by the binary, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Identifier of the station record this process drives.
    pub station_id: u64,
    /// Sensor poll interval (milliseconds).
    pub poll_interval_ms: u32,
    /// Poll in-memory simulators instead of the I2C bus.
    pub simulate: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            station_id: 1,
            poll_interval_ms: 1000, // 1 Hz
            simulate: false,
        }
    }
}

impl RuntimeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_interval_ms))
    }
}
