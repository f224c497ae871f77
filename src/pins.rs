//! GPIO / header pin assignments for the station controller board.
//!
//! Single source of truth for actuator addressing: settings name outputs by
//! BCM GPIO number, and only numbers that appear in [`HEADER_PINS`] can be
//! driven.  Everything else is rejected with
//! [`ActuatorError::UnmappedPin`](crate::error::ActuatorError::UnmappedPin).

use crate::error::ActuatorError;

/// BCM GPIO number → physical pin on the 40-pin header.
///
/// GPIO 0/1 (ID EEPROM) and 14/15 (UART) are deliberately absent.
pub const HEADER_PINS: [(i32, u8); 24] = [
    (2, 3),
    (3, 5),
    (4, 7),
    (5, 29),
    (6, 31),
    (7, 26),
    (8, 24),
    (9, 21),
    (10, 19),
    (11, 23),
    (12, 32),
    (13, 33),
    (16, 36),
    (17, 11),
    (18, 12),
    (19, 35),
    (20, 38),
    (21, 40),
    (22, 15),
    (23, 16),
    (24, 18),
    (25, 22),
    (26, 37),
    (27, 13),
];

/// Header pin for a BCM GPIO number, if the board exposes it.
pub fn header_pin(gpio: i32) -> Option<u8> {
    HEADER_PINS
        .iter()
        .find(|(bcm, _)| *bcm == gpio)
        .map(|(_, pin)| *pin)
}

/// Like [`header_pin`] but as a typed actuator error.
pub fn require_header_pin(gpio: i32) -> Result<u8, ActuatorError> {
    header_pin(gpio).ok_or(ActuatorError::UnmappedPin(gpio))
}

// ---------------------------------------------------------------------------
// Default outputs
// ---------------------------------------------------------------------------

/// Relay driving the shared pump (active LOW).
pub const DEFAULT_PUMP_GPIO: i32 = 23;
/// Valve for port A (active LOW).
pub const DEFAULT_VALVE_A_GPIO: i32 = 24;
/// Valve for port B (active LOW).
pub const DEFAULT_VALVE_B_GPIO: i32 = 25;
