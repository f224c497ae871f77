//! Fuzz target: settings file parsing
//!
//! Feeds arbitrary text to `StationSettings::from_json` and checks that
//! anything accepted by `validate` is self-consistent:
//! - labels are unique and ports fit the moisture channel range
//! - GPIO numbers are distinct
//! - a validated document survives a `to_json` / `from_json` pass
//!
//! cargo fuzz run fuzz_settings

#![no_main]

use std::collections::HashSet;

use libfuzzer_sys::fuzz_target;
use waterstation::config::{MAX_PORTS, MOISTURE_CHANNELS, StationSettings};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(settings) = StationSettings::from_json(text) else {
        return;
    };
    if settings.validate().is_err() {
        return;
    }

    assert!(!settings.ports.is_empty());
    assert!(settings.ports.len() <= MAX_PORTS);

    let mut labels = HashSet::new();
    let mut gpios = HashSet::from([settings.pump_gpio]);
    for port in &settings.ports {
        assert!(labels.insert(port.port.as_str()), "duplicate label {}", port.port);
        assert!(gpios.insert(port.valve_gpio), "duplicate gpio {}", port.valve_gpio);
        assert!(port.moisture_channel < MOISTURE_CHANNELS);
    }

    let json = settings.to_json().expect("validated settings serialise");
    let again = StationSettings::from_json(&json).expect("own output parses");
    assert_eq!(again.port_labels(), settings.port_labels());
    again.validate().expect("own output validates");
});
