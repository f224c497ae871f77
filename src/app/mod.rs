//! Application core: watering rules and observer fan-out.
//!
//! The controller decides, the registry publishes, the station wires them
//! to the sensor worker.  All interaction with relays, storage and the
//! settings file happens through **port traits** defined in [`ports`],
//! keeping this layer testable without real peripherals.

pub mod controller;
pub mod ports;
pub mod station;
pub mod subscriptions;
