//! Capacitive water-level strip built from two touch-sensing arrays.
//!
//! The strip is 20 sections tall.  The low array covers the bottom 8
//! sections and the high array the top 12; each returns one intensity byte
//! per section.  A section counts as wet when its byte exceeds
//! [`TOUCH_THRESHOLD`].  The level is the number of contiguous wet sections
//! counted up from the bottom, times [`LEVEL_PER_SECTION`], so a dry gap
//! hides any wet sections above it.

use crate::error::SensorError;

use super::{SharedBus, with_bus};

/// Sections on the low array (bits 0..=7 of the touch mask).
pub const LOW_SECTIONS: usize = 8;

/// Sections on the high array (bits 8..=19 of the touch mask).
pub const HIGH_SECTIONS: usize = 12;

/// Intensity above which a section is considered submerged.
pub const TOUCH_THRESHOLD: u8 = 100;

/// Level units contributed by each wet section.
pub const LEVEL_PER_SECTION: f64 = 5.0;

/// Pack the two arrays into a 20-bit mask, bottom section at bit 0.
pub fn touch_mask(low: &[u8; LOW_SECTIONS], high: &[u8; HIGH_SECTIONS]) -> u32 {
    low.iter()
        .chain(high.iter())
        .enumerate()
        .filter(|(_, intensity)| **intensity > TOUCH_THRESHOLD)
        .fold(0u32, |mask, (bit, _)| mask | (1 << bit))
}

/// Level metric for one pair of array reads.
pub fn level_from_sections(low: &[u8; LOW_SECTIONS], high: &[u8; HIGH_SECTIONS]) -> f64 {
    f64::from(touch_mask(low, high).trailing_ones()) * LEVEL_PER_SECTION
}

pub struct WaterLevelSensor {
    bus: SharedBus,
    high_address: u8,
    low_address: u8,
}

impl WaterLevelSensor {
    pub fn new(bus: SharedBus, high_address: u8, low_address: u8) -> Self {
        Self {
            bus,
            high_address,
            low_address,
        }
    }

    pub fn read_value(&self) -> Result<f64, SensorError> {
        let mut high = [0u8; HIGH_SECTIONS];
        let mut low = [0u8; LOW_SECTIONS];
        with_bus(&self.bus, |bus| {
            bus.read(self.high_address, &mut high)?;
            bus.read(self.low_address, &mut low)
        })?;
        Ok(level_from_sections(&low, &high))
    }
}
