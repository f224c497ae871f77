//! Irrigation controller: per-port watering state machine.
//!
//! ```text
//!  readings ──▶ ┌──────────────────────────────┐ ──▶ ActuatorPort (valves, pump)
//!               │    IrrigationController      │
//!  StationStore◀│  PortState table · hysteresis│──▶ SubscriptionRegistry
//!               └──────────────────────────────┘
//! ```
//!
//! Each configured port moves between `Unknown → Idle ⇄ Watering`.
//! Moisture readings within [`MOISTURE_TOLERANCE`] of the last accepted
//! value for the port are dropped before any lookup or I/O.  Water-level
//! readings within [`WATER_LEVEL_TOLERANCE`] are dropped the same way;
//! accepted ones are persisted and published to observers.
//!
//! The single pump is the OR of every port's pump-required flag and is
//! re-evaluated after each reading.  It is only written when the wanted
//! level differs from the level last driven successfully.

use std::collections::BTreeMap;

use futures_lite::future;
use log::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::config::{PortSetting, StationSettings};
use crate::model::Plant;
use crate::sensors::SensorReading;
use crate::sensors::worker::ReadingChannel;

use super::ports::{ActuatorPort, OutputLevel, StationStore};
use super::subscriptions::SubscriptionRegistry;

/// Moisture change (percentage points) at or below which a reading is noise.
pub const MOISTURE_TOLERANCE: f64 = 3.0;

/// Water-level change at or below which a reading is noise.
pub const WATER_LEVEL_TOLERANCE: f64 = 1.0;

/// Watering requires the reservoir strictly above this level.
pub const MIN_WATER_LEVEL: f64 = 1.0;

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortMode {
    /// No moisture reading accepted yet.
    #[default]
    Unknown,
    Idle,
    Watering,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortState {
    pub mode: PortMode,
    /// Last accepted moisture reading; the debounce reference.
    pub last_moisture: Option<f64>,
    pub pump_required: bool,
}

/// What a moisture reading led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Within tolerance of the previous reading.
    Debounced,
    /// Port label not present in the settings.
    UnknownPort,
    /// The store failed; the reading will be re-evaluated next time.
    LookupFailed,
    /// No plant on this port.
    NoPlant,
    Inactive,
    StartWatering,
    /// Thirsty, but the reservoir is too low (or not yet measured).
    ThirstyButDry,
    StopWatering,
}

/// Outcome of a water-level reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelUpdate {
    Debounced,
    /// Persisted and sent to this many subscribers.
    Published { subscribers: usize },
    /// The store failed; nothing was published.
    NotPersisted,
}

/// Whether `new` is within `tolerance` of the previous accepted value.
pub fn within_tolerance(last: Option<f64>, new: f64, tolerance: f64) -> bool {
    last.is_some_and(|last| (new - last).abs() <= tolerance)
}

/// Watering decision for one accepted moisture reading.
pub fn decide(plant: Option<&Plant>, moisture: f64, water_level: Option<f64>) -> Decision {
    let Some(plant) = plant else {
        return Decision::NoPlant;
    };
    if !plant.active {
        return Decision::Inactive;
    }
    if !plant.is_thirsty(moisture) {
        return Decision::StopWatering;
    }
    if water_level.is_some_and(|level| level > MIN_WATER_LEVEL) {
        Decision::StartWatering
    } else {
        Decision::ThirstyButDry
    }
}

/// Drive one output, logging and swallowing addressing failures.
fn drive(hw: &mut impl ActuatorPort, gpio: i32, level: OutputLevel) -> bool {
    match hw.set_output(gpio, level) {
        Ok(()) => true,
        Err(e) => {
            warn!("Output GPIO{} -> {:?} skipped: {}", gpio, level, e);
            false
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct IrrigationController {
    settings: StationSettings,
    station_id: u64,
    ports: BTreeMap<String, PortState>,
    last_water_level: Option<f64>,
    /// Pump level last written successfully.
    pump_driven: Option<OutputLevel>,
}

impl IrrigationController {
    /// One `Unknown` entry per configured port.
    pub fn new(settings: StationSettings, station_id: u64) -> Self {
        let ports = settings
            .ports
            .iter()
            .map(|p| (p.port.clone(), PortState::default()))
            .collect();
        Self {
            settings,
            station_id,
            ports,
            last_water_level: None,
            pump_driven: None,
        }
    }

    pub fn port_state(&self, port: &str) -> Option<&PortState> {
        self.ports.get(port)
    }

    /// Last accepted water level.
    pub fn last_water_level(&self) -> Option<f64> {
        self.last_water_level
    }

    /// OR of every port's pump-required flag.
    pub fn pump_required(&self) -> bool {
        self.ports.values().any(|s| s.pump_required)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive pump and every valve de-energized.
    pub fn init_outputs(&mut self, hw: &mut impl ActuatorPort) {
        self.pump_driven = drive(hw, self.settings.pump_gpio, OutputLevel::DeEnergized)
            .then_some(OutputLevel::DeEnergized);
        for p in &self.settings.ports {
            drive(hw, p.valve_gpio, OutputLevel::DeEnergized);
        }
    }

    /// Close every valve, stop the pump and forget pending demand.
    pub fn release_outputs(&mut self, hw: &mut impl ActuatorPort) {
        for state in self.ports.values_mut() {
            state.pump_required = false;
            if state.mode == PortMode::Watering {
                state.mode = PortMode::Idle;
            }
        }
        self.init_outputs(hw);
    }

    /// Consume readings until `cancel` fires, then leave outputs safe.
    ///
    /// Returns the controller so callers can inspect the final state.
    pub fn run(
        mut self,
        readings: &ReadingChannel,
        cancel: &CancelToken,
        store: &impl StationStore,
        hw: &mut impl ActuatorPort,
        registry: &SubscriptionRegistry,
    ) -> Self {
        info!(
            "Irrigation controller started (station {}, {} ports)",
            self.station_id,
            self.ports.len()
        );
        self.init_outputs(hw);

        while !cancel.is_cancelled() {
            let next = future::block_on(future::or(
                async { Some(readings.receive().await) },
                async {
                    cancel.cancelled().await;
                    None
                },
            ));
            let Some(reading) = next else { break };
            self.handle(&reading, store, hw, registry);
        }

        self.release_outputs(hw);
        info!("Irrigation controller stopped");
        self
    }

    // ── Per-reading orchestration ─────────────────────────────

    /// Apply one reading, then re-evaluate the pump.
    pub fn handle(
        &mut self,
        reading: &SensorReading,
        store: &impl StationStore,
        hw: &mut impl ActuatorPort,
        registry: &SubscriptionRegistry,
    ) {
        match reading {
            SensorReading::WaterLevel(level) => {
                self.on_water_level(*level, store, registry);
            }
            SensorReading::Moisture { port, value } => {
                self.on_moisture(port, *value, store, hw);
            }
        }
        self.apply_pump(hw);
    }

    /// Per-port transition for a moisture reading.  Does not touch the pump.
    pub fn on_moisture(
        &mut self,
        port: &PortSetting,
        value: f64,
        store: &impl StationStore,
        hw: &mut impl ActuatorPort,
    ) -> Decision {
        let Some(last) = self.ports.get(&port.port).map(|s| s.last_moisture) else {
            warn!("Moisture reading for unconfigured port {}", port.port);
            return Decision::UnknownPort;
        };
        if within_tolerance(last, value, MOISTURE_TOLERANCE) {
            debug!("Port {}: moisture {} within tolerance", port.port, value);
            return Decision::Debounced;
        }

        let plant = match store.find_plant_by_port(&port.port, self.station_id) {
            Ok(plant) => plant,
            Err(e) => {
                error!("Port {}: plant lookup failed: {}", port.port, e);
                return Decision::LookupFailed;
            }
        };

        let decision = decide(plant.as_ref(), value, self.last_water_level);
        let Some(state) = self.ports.get_mut(&port.port) else {
            return Decision::UnknownPort;
        };

        match decision {
            Decision::StartWatering => {
                if state.mode != PortMode::Watering {
                    info!("Port {}: {:?} -> Watering (moisture {})", port.port, state.mode, value);
                }
                state.mode = PortMode::Watering;
                state.pump_required = true;
                drive(hw, port.valve_gpio, OutputLevel::Energized);
            }
            Decision::StopWatering => {
                debug!("Port {}: not thirsty (moisture {})", port.port, value);
                if state.mode != PortMode::Idle {
                    info!("Port {}: {:?} -> Idle", port.port, state.mode);
                }
                state.mode = PortMode::Idle;
                state.pump_required = false;
                drive(hw, port.valve_gpio, OutputLevel::DeEnergized);
            }
            Decision::ThirstyButDry => {
                warn!("Port {}: plant is thirsty but the reservoir is dry", port.port);
            }
            Decision::Inactive => info!("Port {}: plant not active", port.port),
            Decision::NoPlant => debug!("Port {}: no plant", port.port),
            Decision::Debounced | Decision::UnknownPort | Decision::LookupFailed => {}
        }

        state.last_moisture = Some(value);
        decision
    }

    /// Persist and publish a water-level reading unless it is noise.
    ///
    /// The accepted level is kept even when persistence fails, so the
    /// watering gate follows the sensor rather than the store.
    pub fn on_water_level(
        &mut self,
        level: f64,
        store: &impl StationStore,
        registry: &SubscriptionRegistry,
    ) -> LevelUpdate {
        if within_tolerance(self.last_water_level, level, WATER_LEVEL_TOLERANCE) {
            return LevelUpdate::Debounced;
        }
        self.last_water_level = Some(level);

        let saved = store.get_station(self.station_id).and_then(|mut station| {
            station.water_level = level;
            store.save_station(&station).map(|()| station)
        });

        match saved {
            Ok(station) => {
                let subscribers = registry.broadcast(&station);
                debug!("Water level {} published to {} subscribers", level, subscribers);
                LevelUpdate::Published { subscribers }
            }
            Err(e) => {
                error!("Water level {} not persisted: {}", level, e);
                LevelUpdate::NotPersisted
            }
        }
    }

    fn apply_pump(&mut self, hw: &mut impl ActuatorPort) {
        let wanted = OutputLevel::from_energized(self.pump_required());
        if self.pump_driven == Some(wanted) {
            return;
        }
        if drive(hw, self.settings.pump_gpio, wanted) {
            info!("Pump {:?}", wanted);
            self.pump_driven = Some(wanted);
        }
    }
}
