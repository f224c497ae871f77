//! Capacitive soil-moisture sensor behind an 8-channel I2C ADC.
//!
//! Each port reads its own ADC channel: write the channel register
//! (`0x20 + channel`), then read two bytes little-endian.  Raw counts fall
//! as the soil gets wetter.

use crate::config::{MOISTURE_CHANNELS, PortSetting};
use crate::error::SensorError;

use super::{SharedBus, with_bus};

/// Raw count at or below which the soil is saturated.
pub const WET_RAW: u16 = 1000;

/// Raw count at or above which the soil is bone dry.
pub const DRY_RAW: u16 = 2000;

/// First per-channel read register on the ADC.
const CHANNEL_REGISTER_BASE: u8 = 0x20;

/// Map a raw ADC count to a moisture percentage in `[0, 100]`.
pub fn moisture_percent(raw: u16) -> f64 {
    if raw <= WET_RAW {
        100.0
    } else if raw >= DRY_RAW {
        0.0
    } else {
        f64::from(DRY_RAW - raw) / 10.0
    }
}

pub struct MoistureSensor {
    bus: SharedBus,
    address: u8,
    setting: PortSetting,
}

impl MoistureSensor {
    pub fn new(bus: SharedBus, address: u8, setting: PortSetting) -> Self {
        Self {
            bus,
            address,
            setting,
        }
    }

    pub fn port(&self) -> &PortSetting {
        &self.setting
    }

    /// Raw ADC count for this port's channel.
    pub fn read_raw(&self) -> Result<u16, SensorError> {
        let channel = self.setting.moisture_channel;
        if channel >= MOISTURE_CHANNELS {
            return Err(SensorError::NoSuchChannel(channel));
        }
        let register = CHANNEL_REGISTER_BASE + channel;
        let mut buf = [0u8; 2];
        with_bus(&self.bus, |bus| bus.write_read(self.address, &[register], &mut buf))?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_value(&self) -> Result<f64, SensorError> {
        self.read_raw().map(moisture_percent)
    }
}
