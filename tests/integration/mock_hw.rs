//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full output
//! history, and wraps the in-memory store with switchable failures and
//! call counters.  Everything is `Send + Sync` so the same mocks serve the
//! threaded station tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use waterstation::adapters::memory_store::{DEFAULT_STATION_ID, MemoryStore};
use waterstation::app::ports::{ActuatorPort, OutputLevel, StationStore};
use waterstation::error::{ActuatorError, StoreError};
use waterstation::model::{Plant, PlantTemplate, Station};

pub const PUMP: i32 = 23;
pub const VALVE_A: i32 = 24;
pub const VALVE_B: i32 = 25;

/// Poll `cond` until it holds, failing the test after two seconds.
#[allow(dead_code)]
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub fn plant(port: &str, active: bool, threshold: f64) -> Plant {
    Plant {
        id: u64::from(port.as_bytes()[0]),
        station_id: DEFAULT_STATION_ID,
        active,
        name: format!("Plant {port}"),
        port: port.into(),
        template: PlantTemplate {
            id: 1,
            name: "Herbs".into(),
            water_threshold: threshold,
        },
    }
}

// ── MockActuators ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockActuators {
    calls: Arc<Mutex<Vec<(i32, OutputLevel)>>>,
    broken: Arc<Mutex<Vec<i32>>>,
}

#[allow(dead_code)]
impl MockActuators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes to `gpio` fail as if it had no header mapping.
    pub fn failing_on(gpio: i32) -> Self {
        let mock = Self::new();
        mock.broken.lock().unwrap().push(gpio);
        mock
    }

    pub fn calls(&self) -> Vec<(i32, OutputLevel)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn calls_to(&self, gpio: i32) -> Vec<OutputLevel> {
        self.calls()
            .into_iter()
            .filter(|(g, _)| *g == gpio)
            .map(|(_, level)| level)
            .collect()
    }

    /// Last level written to `gpio`.
    pub fn level(&self, gpio: i32) -> Option<OutputLevel> {
        self.calls_to(gpio).last().copied()
    }

    pub fn is_energized(&self, gpio: i32) -> bool {
        self.level(gpio) == Some(OutputLevel::Energized)
    }
}

impl ActuatorPort for MockActuators {
    fn set_output(&mut self, gpio: i32, level: OutputLevel) -> Result<(), ActuatorError> {
        if self.broken.lock().unwrap().contains(&gpio) {
            return Err(ActuatorError::UnmappedPin(gpio));
        }
        self.calls.lock().unwrap().push((gpio, level));
        Ok(())
    }
}

// ── MockStore ─────────────────────────────────────────────────

pub struct MockStore {
    inner: MemoryStore,
    pub fail_get: AtomicBool,
    pub fail_save: AtomicBool,
    pub fail_lookup: AtomicBool,
    saves: AtomicUsize,
    lookups: AtomicUsize,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::with_default_station(),
            fail_get: AtomicBool::new(false),
            fail_save: AtomicBool::new(false),
            fail_lookup: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_plants(plants: impl IntoIterator<Item = Plant>) -> Self {
        let store = Self::new();
        for p in plants {
            store.inner.upsert_plant(p).unwrap();
        }
        store
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn stored_water_level(&self) -> f64 {
        self.inner.get_station(DEFAULT_STATION_ID).unwrap().water_level
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StationStore for MockStore {
    fn get_station(&self, id: u64) -> Result<Station, StoreError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::IoError);
        }
        self.inner.get_station(id)
    }

    fn save_station(&self, station: &Station) -> Result<(), StoreError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StoreError::IoError);
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_station(station)
    }

    fn find_plant_by_port(&self, port: &str, station_id: u64) -> Result<Option<Plant>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(StoreError::IoError);
        }
        self.inner.find_plant_by_port(port, station_id)
    }
}

// ── FixedI2c ──────────────────────────────────────────────────

/// I2C bus answering every read on an address with the same bytes.
#[derive(Clone, Default)]
pub struct FixedI2c {
    responses: Arc<Mutex<HashMap<u8, Vec<u8>>>>,
}

#[allow(dead_code)]
impl FixedI2c {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: u8, bytes: &[u8]) {
        self.responses.lock().unwrap().insert(address, bytes.to_vec());
    }
}

impl ErrorType for FixedI2c {
    type Error = ErrorKind;
}

impl I2c for FixedI2c {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let responses = self.responses.lock().unwrap();
        let bytes = responses
            .get(&address)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
        for op in operations {
            if let Operation::Read(buf) = op {
                let n = buf.len().min(bytes.len());
                buf[..n].copy_from_slice(&bytes[..n]);
            }
        }
        Ok(())
    }
}
