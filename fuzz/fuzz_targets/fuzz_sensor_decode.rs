//! Fuzz target: raw sensor decoding
//!
//! Splits the input into a moisture sample and the two touch-strip
//! register dumps, then checks the decoded values stay in range:
//! - moisture is within 0..=100 percent
//! - water level is a whole number of sections, at most 100
//!
//! cargo fuzz run fuzz_sensor_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use waterstation::sensors::moisture::moisture_percent;
use waterstation::sensors::water_level::{
    HIGH_SECTIONS, LEVEL_PER_SECTION, LOW_SECTIONS, level_from_sections,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 + LOW_SECTIONS + HIGH_SECTIONS {
        return;
    }
    let (raw, rest) = data.split_at(2);
    let (low, rest) = rest.split_at(LOW_SECTIONS);
    let low: [u8; LOW_SECTIONS] = low.try_into().expect("split at LOW_SECTIONS");
    let high: [u8; HIGH_SECTIONS] = rest[..HIGH_SECTIONS].try_into().expect("sliced to HIGH_SECTIONS");

    let pct = moisture_percent(u16::from_le_bytes([raw[0], raw[1]]));
    assert!((0.0..=100.0).contains(&pct));

    let level = level_from_sections(&low, &high);
    assert!((0.0..=100.0).contains(&level));
    assert_eq!((level / LEVEL_PER_SECTION).fract(), 0.0);
});
