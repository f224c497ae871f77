//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ IrrigationController (domain)
//! ```
//!
//! Driven adapters (relay outputs, the station repository, the settings
//! file) implement these traits.  The
//! [`IrrigationController`](super::controller::IrrigationController)
//! consumes them via generics, so the domain core never touches hardware
//! or storage directly.
//!
//! All port errors are typed; callers decide per variant whether to log,
//! retry on the next reading, or abort startup.

use crate::config::StationSettings;
use crate::error::{ActuatorError, ConfigError, StoreError};
use crate::model::{Plant, Station};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → relays)
// ───────────────────────────────────────────────────────────────

/// Logical state of a relay output.
///
/// The relay boards are active-low: [`Energized`](Self::Energized) drives
/// the pin LOW (pump running, valve open) and
/// [`DeEnergized`](Self::DeEnergized) drives it HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Energized,
    DeEnergized,
}

impl OutputLevel {
    /// Electrical pin level: `true` = HIGH.
    pub fn is_high(self) -> bool {
        matches!(self, Self::DeEnergized)
    }

    pub fn from_energized(on: bool) -> Self {
        if on { Self::Energized } else { Self::DeEnergized }
    }
}

/// Write-side port: the domain calls this to drive pump and valve relays.
pub trait ActuatorPort {
    /// Drive BCM `gpio` to `level`.
    ///
    /// Fails with [`ActuatorError::UnmappedPin`] when the GPIO has no
    /// header mapping; the controller logs and carries on.
    fn set_output(&mut self, gpio: i32, level: OutputLevel) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Station store (driven adapter: domain ↔ repository)
// ───────────────────────────────────────────────────────────────

/// Persistence collaborator for station records.
///
/// Shared between the controller thread and the embedding application, so
/// methods take `&self`; implementations synchronise internally.
pub trait StationStore {
    /// Load a station with its plants.
    fn get_station(&self, id: u64) -> Result<Station, StoreError>;

    /// Persist a station record.
    fn save_station(&self, station: &Station) -> Result<(), StoreError>;

    /// The plant on `port` of station `station_id`, if any.
    ///
    /// `Ok(None)` means the port is empty, which is not an error.
    fn find_plant_by_port(&self, port: &str, station_id: u64)
    -> Result<Option<Plant>, StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Settings source (driven adapter: domain ← settings file)
// ───────────────────────────────────────────────────────────────

/// Loads station settings once at startup.
///
/// Implementations parse but do not validate; the station validates before
/// any actuator is touched.  A missing source is reported as
/// [`ConfigError::NotFound`] so the binary can fall back to defaults.
pub trait SettingsSource {
    fn load(&self) -> Result<StationSettings, ConfigError>;
}
