//! Station facade: wires sensors, worker, controller and observers.
//!
//! ```text
//!                        ┌────────────── IrrigationStation ───────────────┐
//!  SensorSource ──▶      │ SensorWorker ──readings──▶ IrrigationController │──▶ ActuatorPort
//!                        │                                  │              │
//!  subscribe() ◀──────── │ SubscriptionRegistry ◀─broadcast─┘              │──▶ StationStore
//!                        └────────────────────────────────────────────────┘
//! ```
//!
//! [`IrrigationStation::start`] validates the settings before anything is
//! spawned; invalid settings are the only fatal error.  Dropping the
//! station shuts it down.

use std::sync::Arc;
use std::thread::JoinHandle;

use log::{info, warn};

use crate::cancel::CancelToken;
use crate::config::{RuntimeConfig, StationSettings};
use crate::error::Error;
use crate::sensors::SharedBus;
use crate::sensors::moisture::MoistureSensor;
use crate::sensors::sim::{self, MoistureSim, MoistureSimHandle, WaterLevelSim, WaterLevelSimHandle};
use crate::sensors::water_level::WaterLevelSensor;
use crate::sensors::worker::{SensorWorker, WorkerHandle};
use crate::task;

use super::controller::IrrigationController;
use super::ports::{ActuatorPort, StationStore};
use super::subscriptions::{Subscription, SubscriptionRegistry};

/// Where readings come from.
pub enum SensorSource {
    /// In-memory simulators, settable through the station.
    Simulated,
    /// Hardware sensors sharing one I2C bus.
    Hardware(SharedBus),
}

pub struct IrrigationStation {
    settings: StationSettings,
    registry: Arc<SubscriptionRegistry>,
    cancel: CancelToken,
    worker: Option<WorkerHandle>,
    controller: Option<JoinHandle<()>>,
    moisture_sims: Vec<MoistureSimHandle>,
    water_level_sim: Option<WaterLevelSimHandle>,
}

impl IrrigationStation {
    /// Validate `settings`, then start the controller and the sensor worker.
    pub fn start<S, A>(
        settings: StationSettings,
        runtime: &RuntimeConfig,
        source: SensorSource,
        store: Arc<S>,
        actuators: A,
    ) -> Result<Self, Error>
    where
        S: StationStore + Send + Sync + 'static,
        A: ActuatorPort + Send + 'static,
    {
        settings.validate()?;

        let mut worker = SensorWorker::new(runtime.poll_interval());
        let mut moisture_sims = Vec::new();
        let mut water_level_sim = None;

        match source {
            SensorSource::Simulated => {
                let water = WaterLevelSim::default();
                water_level_sim = Some(water.handle());
                worker.add(water);
                for port in &settings.ports {
                    let sim = MoistureSim::new(port.clone());
                    moisture_sims.push(sim.handle());
                    worker.add(sim);
                }
            }
            SensorSource::Hardware(bus) => {
                worker.add(WaterLevelSensor::new(
                    Arc::clone(&bus),
                    settings.water_level_high_address,
                    settings.water_level_low_address,
                ));
                for port in &settings.ports {
                    worker.add(MoistureSensor::new(
                        Arc::clone(&bus),
                        settings.moisture_address,
                        port.clone(),
                    ));
                }
            }
        }

        let registry = Arc::new(SubscriptionRegistry::new());
        let cancel = CancelToken::new();

        let controller = {
            let readings = worker.readings();
            let registry = Arc::clone(&registry);
            let cancel = cancel.clone();
            let controller = IrrigationController::new(settings.clone(), runtime.station_id);
            let mut actuators = actuators;
            task::spawn_named("irrigation-ctl", task::LOOP_STACK_KB, move || {
                controller.run(&readings, &cancel, store.as_ref(), &mut actuators, &registry);
            })?
        };

        let worker = match worker.start() {
            Ok(worker) => worker,
            Err(e) => {
                cancel.cancel();
                if controller.join().is_err() {
                    warn!("Irrigation controller panicked");
                }
                return Err(e);
            }
        };

        info!(
            "Station {} running ({} ports, {})",
            runtime.station_id,
            settings.ports.len(),
            if water_level_sim.is_some() { "simulated" } else { "hardware" }
        );

        Ok(Self {
            settings,
            registry,
            cancel,
            worker: Some(worker),
            controller: Some(controller),
            moisture_sims,
            water_level_sim,
        })
    }

    pub fn settings(&self) -> &StationSettings {
        &self.settings
    }

    /// Port labels in configured order.
    pub fn possible_ports(&self) -> Vec<String> {
        self.settings.port_labels()
    }

    /// Observe station snapshots published after each accepted water-level
    /// change.  See [`SubscriptionRegistry::subscribe`].
    pub fn subscribe(&self, cancel: CancelToken) -> Subscription {
        self.registry.subscribe(cancel)
    }

    pub fn is_simulated(&self) -> bool {
        self.water_level_sim.is_some()
    }

    /// Force the next simulated moisture reading on `port`.
    ///
    /// Returns `false` when no simulator serves that port (unknown label or
    /// hardware mode).
    pub fn set_moisture_fake_value(&self, port: &str, value: f64) -> bool {
        let mut matched = false;
        for handle in self.moisture_sims.iter().filter(|h| h.port() == port) {
            handle.set(value);
            matched = true;
        }
        if !matched {
            warn!("No moisture simulator for port {}", port);
        }
        matched
    }

    /// Ramp the simulated water level to `value`, one unit every
    /// 100–300 ms.  Blocks until the target is reached.
    pub fn set_water_level_fake_value(&self, value: f64) -> bool {
        match &self.water_level_sim {
            Some(handle) => {
                handle.ramp_to(value, sim::ramp_pause);
                true
            }
            None => {
                warn!("Water level is not simulated");
                false
            }
        }
    }

    /// Stop the worker and controller, drive outputs safe and end every
    /// subscription.  Idempotent.
    pub fn shutdown(&mut self) {
        if self.worker.is_none() && self.controller.is_none() {
            return;
        }
        self.cancel.cancel();

        if let Some(worker) = self.worker.take() {
            worker.join();
        }
        if let Some(controller) = self.controller.take() {
            if controller.join().is_err() {
                warn!("Irrigation controller panicked");
            }
        }
        self.registry.close();
        info!("Station shut down");
    }
}

impl Drop for IrrigationStation {
    fn drop(&mut self) {
        self.shutdown();
    }
}
