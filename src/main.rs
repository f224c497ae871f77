//! WaterStation host entry point.
//!
//! Runs a simulated station against an in-memory store and logs every
//! published snapshot until Ctrl-C.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  FileSettings      MemoryStore       SimActuators            │
//! │  (SettingsSource)  (StationStore)    (ActuatorPort)          │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ───────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                IrrigationStation                       │  │
//! │  │  SensorWorker · IrrigationController · Subscriptions   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use waterstation::adapters::memory_store::{DEFAULT_STATION_ID, MemoryStore};
use waterstation::adapters::settings_file::{DEFAULT_SETTINGS_PATH, FileSettings};
use waterstation::adapters::sim_actuators::SimActuators;
use waterstation::app::ports::SettingsSource;
use waterstation::app::station::{IrrigationStation, SensorSource};
use waterstation::cancel::CancelToken;
use waterstation::config::{RuntimeConfig, StationSettings};
use waterstation::error::ConfigError;
use waterstation::model::{Plant, PlantTemplate};
use waterstation::task;

/// Moisture threshold given to the demo plants.
const DEMO_THRESHOLD: f64 = 40.0;

#[derive(Parser, Debug)]
#[command(name = "waterstation", version, about = "Automated plant-irrigation station")]
struct Args {
    /// Station settings JSON file (defaults are used when it is absent)
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Sensor poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u32,

    /// Seed plants and walk the simulators through a watering cycle
    #[arg(long)]
    demo: bool,
}

fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

fn load_settings(path: &Path) -> Result<StationSettings> {
    match FileSettings::new(path).load() {
        Ok(settings) => Ok(settings),
        Err(ConfigError::NotFound) => {
            warn!("{} not found, using default settings", path.display());
            Ok(StationSettings::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", path.display())),
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging();
    info!("WaterStation v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Settings (fatal if present but invalid) ────────────
    let settings = load_settings(&args.settings)?;
    let runtime = RuntimeConfig {
        station_id: DEFAULT_STATION_ID,
        poll_interval_ms: args.poll_interval_ms,
        // No I2C HAL on the host build.
        simulate: true,
    };

    // ── 2. Adapters ───────────────────────────────────────────
    let store = Arc::new(MemoryStore::with_default_station());
    if args.demo {
        seed_demo_plants(&store, &settings, runtime.station_id)?;
    }
    let outputs = SimActuators::new();

    // ── 3. Station ────────────────────────────────────────────
    let mut station = IrrigationStation::start(
        settings,
        &runtime,
        SensorSource::Simulated,
        Arc::clone(&store),
        outputs.clone(),
    )
    .context("starting station")?;
    info!("Ports: {:?}", station.possible_ports());

    let shutdown = CancelToken::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.cancel()).context("installing Ctrl-C handler")?;
    }

    let observer = station.subscribe(shutdown.clone());
    let observer_thread = task::spawn_named("station-observer", task::HELPER_STACK_KB, move || {
        for snapshot in observer {
            info!(
                "Station '{}' water level {} ({} plants)",
                snapshot.name,
                snapshot.water_level,
                snapshot.plants.len()
            );
        }
    })?;

    // ── 4. Run until Ctrl-C ───────────────────────────────────
    if args.demo {
        run_demo(&station, &outputs, &shutdown, runtime.poll_interval());
    }
    shutdown.wait();

    info!("Shutting down");
    station.shutdown();
    if observer_thread.join().is_err() {
        warn!("Observer thread panicked");
    }
    Ok(())
}

// ── Demo ──────────────────────────────────────────────────────

fn seed_demo_plants(store: &MemoryStore, settings: &StationSettings, station_id: u64) -> Result<()> {
    for (id, port) in (1..).zip(&settings.ports) {
        store.upsert_plant(Plant {
            id,
            station_id,
            active: true,
            name: format!("Plant {}", port.port),
            port: port.port.clone(),
            template: PlantTemplate {
                id: 1,
                name: "Herbs".into(),
                water_threshold: DEMO_THRESHOLD,
            },
        })?;
    }
    info!("[demo] {} plants seeded (threshold {})", settings.ports.len(), DEMO_THRESHOLD);
    Ok(())
}

/// Sleep for `d`, returning `false` early if shutdown was requested.
fn settle(shutdown: &CancelToken, d: Duration) -> bool {
    let deadline = Instant::now() + d;
    while Instant::now() < deadline {
        if shutdown.is_cancelled() {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    !shutdown.is_cancelled()
}

fn report(station: &IrrigationStation, outputs: &SimActuators) {
    let settings = station.settings();
    for port in &settings.ports {
        info!(
            "[demo] port {} valve {}",
            port.port,
            if outputs.is_energized(port.valve_gpio) { "OPEN" } else { "closed" }
        );
    }
    info!(
        "[demo] pump {}",
        if outputs.is_energized(settings.pump_gpio) { "ON" } else { "off" }
    );
}

fn run_demo(station: &IrrigationStation, outputs: &SimActuators, shutdown: &CancelToken, poll: Duration) {
    let wait = poll * 3;

    info!("[demo] reservoir drains to 95");
    station.set_water_level_fake_value(95.0);
    if !settle(shutdown, wait) {
        return;
    }

    for port in station.possible_ports() {
        info!("[demo] port {} dries out", port);
        station.set_moisture_fake_value(&port, 30.0);
        if !settle(shutdown, wait) {
            return;
        }
        report(station, outputs);

        info!("[demo] port {} is watered", port);
        station.set_moisture_fake_value(&port, 70.0);
        if !settle(shutdown, wait) {
            return;
        }
        report(station, outputs);
    }

    info!("[demo] finished, press Ctrl-C to exit");
}
