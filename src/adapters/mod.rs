//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements     | Connects to                     |
//! |------------------|----------------|---------------------------------|
//! | `gpio`           | ActuatorPort   | embedded-hal `OutputPin` relays |
//! | `sim_actuators`  | ActuatorPort   | in-memory output table          |
//! | `memory_store`   | StationStore   | in-memory station records       |
//! | `settings_file`  | SettingsSource | JSON settings file              |

pub mod gpio;
pub mod memory_store;
pub mod settings_file;
pub mod sim_actuators;
