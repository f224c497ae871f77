//! Integration tests for the reading → decision → actuator pipeline.
//!
//! Drive [`IrrigationController`] one reading at a time against the mock
//! store and actuators, then check the exact output history.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use embassy_sync::channel::Channel;
use futures_lite::future;

use waterstation::app::controller::{Decision, IrrigationController, LevelUpdate, PortMode};
use waterstation::app::ports::OutputLevel;
use waterstation::app::subscriptions::SubscriptionRegistry;
use waterstation::cancel::CancelToken;
use waterstation::config::StationSettings;
use waterstation::sensors::SensorReading;
use waterstation::sensors::worker::ReadingChannel;

use super::mock_hw::{MockActuators, MockStore, PUMP, VALVE_A, VALVE_B, plant, wait_until};

struct Rig {
    ctl: IrrigationController,
    settings: StationSettings,
    store: MockStore,
    hw: MockActuators,
    registry: Arc<SubscriptionRegistry>,
}

impl Rig {
    fn new(store: MockStore) -> Self {
        let settings = StationSettings::default();
        Self {
            ctl: IrrigationController::new(settings.clone(), 1),
            settings,
            store,
            hw: MockActuators::new(),
            registry: Arc::new(SubscriptionRegistry::new()),
        }
    }

    fn moisture(&self, port: &str, value: f64) -> SensorReading {
        SensorReading::Moisture {
            port: self.settings.port(port).unwrap().clone(),
            value,
        }
    }

    fn feed(&mut self, reading: &SensorReading) {
        let mut hw = self.hw.clone();
        self.ctl.handle(reading, &self.store, &mut hw, &self.registry);
    }

    fn feed_moisture(&mut self, port: &str, value: f64) {
        let reading = self.moisture(port, value);
        self.feed(&reading);
    }

    fn decide(&mut self, port: &str, value: f64) -> Decision {
        let setting = self.settings.port(port).unwrap().clone();
        let mut hw = self.hw.clone();
        self.ctl.on_moisture(&setting, value, &self.store, &mut hw)
    }

    fn mode(&self, port: &str) -> PortMode {
        self.ctl.port_state(port).unwrap().mode
    }
}

// ── Watering decisions ────────────────────────────────────────

#[test]
fn thirsty_plant_with_water_energizes_valve_and_pump() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));

    rig.feed(&SensorReading::WaterLevel(5.0));
    rig.feed_moisture("A", 35.0);

    assert_eq!(rig.mode("A"), PortMode::Watering);
    assert!(rig.ctl.port_state("A").unwrap().pump_required);
    assert!(rig.hw.is_energized(VALVE_A));
    assert!(rig.hw.is_energized(PUMP));
}

#[test]
fn thirsty_plant_without_water_is_not_watered() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));

    rig.feed(&SensorReading::WaterLevel(0.0));
    assert_eq!(rig.decide("A", 35.0), Decision::ThirstyButDry);

    assert_ne!(rig.mode("A"), PortMode::Watering);
    assert!(!rig.ctl.pump_required());
    assert!(rig.hw.calls_to(VALVE_A).is_empty());
    assert!(!rig.hw.is_energized(PUMP));
}

#[test]
fn unmeasured_reservoir_counts_as_dry() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    assert_eq!(rig.decide("A", 10.0), Decision::ThirstyButDry);
    assert!(rig.hw.calls().is_empty());
}

#[test]
fn satisfied_plant_closes_its_valve() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    rig.feed(&SensorReading::WaterLevel(50.0));
    rig.feed_moisture("A", 20.0);
    assert_eq!(rig.mode("A"), PortMode::Watering);

    rig.feed_moisture("A", 60.0);
    assert_eq!(rig.mode("A"), PortMode::Idle);
    assert_eq!(rig.hw.level(VALVE_A), Some(OutputLevel::DeEnergized));
    assert_eq!(rig.hw.level(PUMP), Some(OutputLevel::DeEnergized));
}

#[test]
fn inactive_plant_never_moves_outputs() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", false, 40.0)]));
    rig.feed(&SensorReading::WaterLevel(80.0));

    for value in [5.0, 90.0, 0.0, 100.0, 12.0] {
        rig.feed_moisture("A", value);
        assert_eq!(rig.mode("A"), PortMode::Unknown);
    }
    assert!(rig.hw.calls_to(VALVE_A).is_empty());
    assert!(!rig.hw.is_energized(PUMP));
}

#[test]
fn empty_port_is_ignored() {
    let mut rig = Rig::new(MockStore::new());
    rig.feed(&SensorReading::WaterLevel(80.0));
    assert_eq!(rig.decide("B", 1.0), Decision::NoPlant);
    assert!(rig.hw.calls_to(VALVE_B).is_empty());
}

// ── Hysteresis ────────────────────────────────────────────────

#[test]
fn readings_within_tolerance_cause_no_io() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    let mut hw = rig.hw.clone();
    rig.ctl.init_outputs(&mut hw);
    rig.feed(&SensorReading::WaterLevel(50.0));
    rig.feed_moisture("A", 35.0);

    let lookups = rig.store.lookups();
    let state = *rig.ctl.port_state("A").unwrap();
    rig.hw.clear();

    for value in [38.0, 32.0, 35.5, 37.9] {
        rig.feed_moisture("A", value);
    }

    assert!(rig.hw.calls().is_empty(), "unexpected calls {:?}", rig.hw.calls());
    assert_eq!(rig.store.lookups(), lookups);
    assert_eq!(rig.ctl.port_state("A"), Some(&state));
}

#[test]
fn water_level_change_of_one_is_noise() {
    let mut rig = Rig::new(MockStore::new());
    let sub = rig.registry.subscribe(CancelToken::new());

    assert_eq!(
        rig.ctl.on_water_level(10.0, &rig.store, &rig.registry),
        LevelUpdate::Published { subscribers: 1 }
    );
    assert_eq!(
        rig.ctl.on_water_level(11.0, &rig.store, &rig.registry),
        LevelUpdate::Debounced
    );
    assert_eq!(rig.store.saves(), 1);

    assert_eq!(
        rig.ctl.on_water_level(11.1, &rig.store, &rig.registry),
        LevelUpdate::Published { subscribers: 1 }
    );
    assert_eq!(rig.store.saves(), 2);
    assert!((rig.store.stored_water_level() - 11.1).abs() < 1e-9);

    let levels: Vec<f64> = std::iter::from_fn(|| sub.try_recv()).map(|s| s.water_level).collect();
    assert_eq!(levels, vec![10.0, 11.1]);
}

// ── Pump aggregation ──────────────────────────────────────────

#[test]
fn pump_runs_while_any_port_needs_it() {
    let mut rig = Rig::new(MockStore::with_plants([
        plant("A", true, 40.0),
        plant("B", true, 40.0),
    ]));
    rig.feed(&SensorReading::WaterLevel(50.0));

    rig.feed_moisture("A", 30.0);
    rig.feed_moisture("B", 70.0);
    assert!(rig.ctl.port_state("A").unwrap().pump_required);
    assert!(!rig.ctl.port_state("B").unwrap().pump_required);
    assert!(rig.hw.is_energized(PUMP));

    rig.feed_moisture("B", 20.0);
    rig.feed_moisture("A", 70.0);
    assert!(rig.hw.is_energized(PUMP), "B still needs water");

    rig.feed_moisture("B", 70.0);
    assert_eq!(rig.hw.level(PUMP), Some(OutputLevel::DeEnergized));
}

#[test]
fn pump_is_written_only_on_change() {
    let mut rig = Rig::new(MockStore::with_plants([
        plant("A", true, 40.0),
        plant("B", true, 40.0),
    ]));
    rig.feed(&SensorReading::WaterLevel(50.0));
    rig.feed_moisture("A", 30.0);
    rig.feed_moisture("B", 30.0);
    rig.feed(&SensorReading::WaterLevel(60.0));

    assert_eq!(
        rig.hw.calls_to(PUMP),
        vec![OutputLevel::DeEnergized, OutputLevel::Energized]
    );
}

// ── Failure handling ──────────────────────────────────────────

#[test]
fn valve_fault_is_skipped_and_the_loop_carries_on() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    rig.hw = MockActuators::failing_on(VALVE_A);

    rig.feed(&SensorReading::WaterLevel(50.0));
    rig.feed_moisture("A", 35.0);

    assert_eq!(rig.mode("A"), PortMode::Watering);
    assert!(rig.hw.calls_to(VALVE_A).is_empty());
    assert!(rig.hw.is_energized(PUMP));
    // The reading was recorded, so a nearby one is debounced.
    assert_eq!(rig.decide("A", 36.0), Decision::Debounced);
}

#[test]
fn pump_fault_is_retried_on_the_next_reading() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    rig.hw = MockActuators::failing_on(PUMP);
    rig.feed(&SensorReading::WaterLevel(50.0));
    rig.feed_moisture("A", 35.0);
    assert!(rig.hw.calls_to(PUMP).is_empty());

    // Same port state, healthy actuators: the pending pump write goes out.
    let healthy = MockActuators::new();
    rig.hw = healthy.clone();
    rig.feed(&SensorReading::WaterLevel(50.5));
    assert!(healthy.is_energized(PUMP));
}

#[test]
fn plant_lookup_failure_is_retried() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    rig.feed(&SensorReading::WaterLevel(50.0));

    rig.store.fail_lookup.store(true, Ordering::SeqCst);
    assert_eq!(rig.decide("A", 35.0), Decision::LookupFailed);
    assert_eq!(rig.ctl.port_state("A").unwrap().last_moisture, None);

    rig.store.fail_lookup.store(false, Ordering::SeqCst);
    assert_eq!(rig.decide("A", 35.0), Decision::StartWatering);
}

#[test]
fn failed_save_publishes_nothing_but_gates_watering() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    let sub = rig.registry.subscribe(CancelToken::new());
    rig.store.fail_save.store(true, Ordering::SeqCst);

    assert_eq!(
        rig.ctl.on_water_level(50.0, &rig.store, &rig.registry),
        LevelUpdate::NotPersisted
    );
    assert!(sub.try_recv().is_none());
    assert_eq!(rig.ctl.last_water_level(), Some(50.0));

    rig.feed_moisture("A", 35.0);
    assert_eq!(rig.mode("A"), PortMode::Watering);
}

#[test]
fn failed_station_read_is_not_persisted() {
    let mut rig = Rig::new(MockStore::new());
    rig.store.fail_get.store(true, Ordering::SeqCst);
    assert_eq!(
        rig.ctl.on_water_level(50.0, &rig.store, &rig.registry),
        LevelUpdate::NotPersisted
    );
    assert_eq!(rig.store.saves(), 0);
}

#[test]
fn reading_for_unconfigured_port_is_dropped() {
    let mut rig = Rig::new(MockStore::with_plants([plant("A", true, 40.0)]));
    let stray = waterstation::config::PortSetting {
        port: "Z".into(),
        moisture_channel: 7,
        valve_gpio: 26,
    };
    let mut hw = rig.hw.clone();
    assert_eq!(
        rig.ctl.on_moisture(&stray, 1.0, &rig.store, &mut hw),
        Decision::UnknownPort
    );
    assert!(rig.hw.calls().is_empty());
}

// ── Run loop ──────────────────────────────────────────────────

#[test]
fn run_loop_stops_on_cancel_and_leaves_outputs_safe() {
    let store = Arc::new(MockStore::with_plants([plant("A", true, 40.0)]));
    let hw = MockActuators::new();
    let registry = Arc::new(SubscriptionRegistry::new());
    let readings: Arc<ReadingChannel> = Arc::new(Channel::new());
    let cancel = CancelToken::new();
    let settings = StationSettings::default();

    let worker = {
        let (store, registry, readings, cancel) =
            (store.clone(), registry.clone(), readings.clone(), cancel.clone());
        let mut hw = hw.clone();
        let ctl = IrrigationController::new(settings.clone(), 1);
        std::thread::spawn(move || ctl.run(&readings, &cancel, store.as_ref(), &mut hw, &registry))
    };

    future::block_on(readings.send(SensorReading::WaterLevel(40.0)));
    future::block_on(readings.send(SensorReading::Moisture {
        port: settings.ports[0].clone(),
        value: 10.0,
    }));
    wait_until("valve A open", || hw.is_energized(VALVE_A));
    assert!(hw.is_energized(PUMP));

    cancel.cancel();
    let ctl = worker.join().unwrap();

    assert_eq!(hw.level(PUMP), Some(OutputLevel::DeEnergized));
    assert_eq!(hw.level(VALVE_A), Some(OutputLevel::DeEnergized));
    assert_eq!(hw.level(VALVE_B), Some(OutputLevel::DeEnergized));
    assert!(!ctl.pump_required());
    assert_eq!(ctl.port_state("A").unwrap().mode, PortMode::Idle);
}
